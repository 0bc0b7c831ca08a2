/// Time source used by the thread history store
use std::time::Duration;

/// Current time in Unix seconds plus an async sleep.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> u64;

    async fn sleep(&self, duration: Duration);
}

impl<C: Clock> Clock for std::rc::Rc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// Clock backed by `Date.now()` and `setTimeout`
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Default)]
pub struct BrowserClock;

#[cfg(target_arch = "wasm32")]
impl Clock for BrowserClock {
    fn now(&self) -> u64 {
        (js_sys::Date::now() / 1000.0) as u64
    }

    async fn sleep(&self, duration: Duration) {
        sleep_ms(i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)).await;
    }
}

#[cfg(target_arch = "wasm32")]
mod timer {
    use wasm_bindgen::prelude::*;

    // Global binding: the background service worker has no `window`
    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = setTimeout)]
        pub fn set_timeout(handler: &js_sys::Function, timeout: i32) -> JsValue;
    }
}

/// Resolve after `ms` milliseconds using the global timer
#[cfg(target_arch = "wasm32")]
pub async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        timer::set_timeout(&resolve, ms.max(0));
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// Deterministic clock for tests; sleeping advances time instantly
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<u64>>,
    sleeps: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: u64) -> Self {
        let clock = ManualClock::default();
        clock.set(now);
        clock
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.set(self.now.get() + seconds);
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.get()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration.as_secs());
    }
}
