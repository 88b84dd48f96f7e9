// Re-export the public API from the appropriate module
#[cfg(target_arch = "wasm32")]
pub use wasm32::*;

#[cfg(not(target_arch = "wasm32"))]
pub use non_wasm32::*;

#[cfg(target_arch = "wasm32")]
pub mod wasm32 {
    use std::time::Duration;

    use dioxus_logger::tracing::debug;
    use tokio::sync::oneshot;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;

    pub async fn sleep(duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }

    /// Resolves on the browser's next animation frame.
    pub async fn next_animation_frame() {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once_into_js(move |_timestamp: f64| {
            let _ = tx.send(());
        });

        let scheduled = web_sys::window()
            .map(|win| win.request_animation_frame(callback.unchecked_ref()).is_ok())
            .unwrap_or(false);

        if scheduled {
            let _ = rx.await;
        } else {
            sleep(Duration::from_millis(16)).await;
        }
    }

    /// Plays a short sound. Failures, including autoplay refusals, are ignored.
    pub fn play_cue(url: &str) {
        let audio = match web_sys::HtmlAudioElement::new_with_src(url) {
            Ok(audio) => audio,
            Err(e) => {
                debug!("scan cue unavailable: {e:?}");
                return;
            }
        };
        match audio.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    debug!("scan cue not played: {e:?}");
                }
            }),
            Err(e) => debug!("scan cue not played: {e:?}"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod non_wasm32 {
    use std::time::Duration;

    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Native builds have no compositor callback; approximate 60 Hz.
    pub async fn next_animation_frame() {
        sleep(Duration::from_millis(16)).await;
    }

    pub fn play_cue(_url: &str) {}
}
