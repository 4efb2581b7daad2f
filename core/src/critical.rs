//! # Interrupt-Masking Critical Sections
//!
//! The firmware has exactly one asynchronous writer: the ADC result-ready
//! interrupt. Masking that single interrupt is therefore enough to make any
//! sequence of main-context operations atomic with respect to it, and it is
//! the only locking discipline the core relies on.
//!
//! [`MaskGuard`] masks on construction and restores the previous state on
//! drop, so nested sections compose. The [`CriticalSection`] token it lends
//! out is the proof of exclusion that [`crate::SampleBuffer::write`] demands.

use core::marker::PhantomData;

/// Enable/disable of the conversion-complete interrupt.
pub trait InterruptControl {
    /// Masks the interrupt. Returns whether it was enabled before.
    fn disable(&self) -> bool;

    /// Puts back the state returned by [`InterruptControl::disable`].
    fn restore(&self, was_enabled: bool);

    /// Unmasks the interrupt.
    fn enable(&self);
}

impl<T: InterruptControl + ?Sized> InterruptControl for &T {
    fn disable(&self) -> bool {
        (**self).disable()
    }

    fn restore(&self, was_enabled: bool) {
        (**self).restore(was_enabled)
    }

    fn enable(&self) {
        (**self).enable()
    }
}

/// Token proving the conversion interrupt is masked for `'cs`.
#[derive(Debug)]
pub struct CriticalSection<'cs> {
    _masked: PhantomData<&'cs ()>,
}

/// Scoped mask of the conversion interrupt.
pub struct MaskGuard<'a, I: InterruptControl + ?Sized> {
    ctrl: &'a I,
    was_enabled: bool,
    token: CriticalSection<'a>,
}

impl<'a, I: InterruptControl + ?Sized> MaskGuard<'a, I> {
    /// Masks the interrupt until the guard is dropped.
    pub fn new(ctrl: &'a I) -> Self {
        let was_enabled = ctrl.disable();
        Self {
            ctrl,
            was_enabled,
            token: CriticalSection {
                _masked: PhantomData,
            },
        }
    }

    /// Proof of exclusion for the guard's lifetime.
    #[inline]
    pub fn token(&self) -> &CriticalSection<'a> {
        &self.token
    }
}

impl<I: InterruptControl + ?Sized> Drop for MaskGuard<'_, I> {
    fn drop(&mut self) {
        self.ctrl.restore(self.was_enabled);
    }
}

/// Runs a closure with the conversion interrupt masked, restoring the
/// previous state afterwards.
pub fn without_interrupts<I, F, R>(ctrl: &I, f: F) -> R
where
    I: InterruptControl + ?Sized,
    F: FnOnce(&CriticalSection<'_>) -> R,
{
    let guard = MaskGuard::new(ctrl);
    f(guard.token())
}
