//! The [`Camera`](super::capture::Camera) for the current platform.
//!
//! In the browser frames come from `getUserMedia` through a `<video>` sink and
//! an off-screen `<canvas>`. Other targets have no camera access yet.

#[cfg(target_arch = "wasm32")]
pub use self::wasm32::WebCamera as PlatformCamera;

#[cfg(not(target_arch = "wasm32"))]
pub use self::non_wasm32::NoCamera as PlatformCamera;

#[cfg(target_arch = "wasm32")]
mod wasm32 {
    use dioxus_logger::tracing::debug;
    use js_sys::{Object, Reflect};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, MediaStream,
        MediaStreamConstraints, MediaStreamTrack,
    };

    use crate::scanner::capture::{Camera, CameraError, VideoConstraints};
    use crate::scanner::frame::Frame;

    /// `HTMLMediaElement.HAVE_CURRENT_DATA`
    const HAVE_CURRENT_DATA: u16 = 2;

    pub struct WebCamera {
        video_id: String,
        canvas_id: String,
        stream: Option<MediaStream>,
        video: Option<HtmlVideoElement>,
        canvas: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
    }

    impl WebCamera {
        /// `video_id` and `canvas_id` name elements that must be in the DOM
        /// when the camera is opened.
        pub fn new(video_id: &str, canvas_id: &str) -> Self {
            Self {
                video_id: video_id.to_string(),
                canvas_id: canvas_id.to_string(),
                stream: None,
                video: None,
                canvas: None,
            }
        }
    }

    impl Camera for WebCamera {
        async fn open(&mut self, constraints: &VideoConstraints) -> Result<(), CameraError> {
            self.release();

            let video: HtmlVideoElement = element_by_id(&self.video_id)
                .ok_or_else(|| CameraError::Other("video element missing".to_string()))?;
            let canvas: HtmlCanvasElement = element_by_id(&self.canvas_id)
                .ok_or_else(|| CameraError::Other("canvas element missing".to_string()))?;
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
                .ok_or_else(|| CameraError::Other("2d canvas unavailable".to_string()))?;

            let media_devices = web_sys::window()
                .ok_or(CameraError::Unsupported)?
                .navigator()
                .media_devices()
                .map_err(|_| CameraError::Unsupported)?;

            let request = MediaStreamConstraints::new();
            request.set_video(&video_constraints(constraints).map_err(classify)?);
            request.set_audio(&JsValue::FALSE);

            let promise = media_devices
                .get_user_media_with_constraints(&request)
                .map_err(classify)?;
            let stream: MediaStream = JsFuture::from(promise).await.map_err(classify)?.unchecked_into();

            video.set_muted(true);
            video.set_src_object(Some(&stream));
            self.stream = Some(stream);
            self.video = Some(video.clone());
            self.canvas = Some((canvas, ctx));

            let playing = video
                .play()
                .map_err(|e| CameraError::Playback(js_message(&e)))?;
            JsFuture::from(playing)
                .await
                .map_err(|e| CameraError::Playback(js_message(&e)))?;
            Ok(())
        }

        fn release(&mut self) {
            if let Some(stream) = self.stream.take() {
                stream
                    .get_tracks()
                    .for_each(&mut |track, _, _| MediaStreamTrack::from(track).stop());
            }
            if let Some(video) = self.video.take() {
                video.set_src_object(None);
            }
            self.canvas = None;
        }

        fn is_open(&self) -> bool {
            self.stream.is_some()
        }

        fn frame_ready(&self) -> bool {
            self.video.as_ref().is_some_and(|video| {
                video.ready_state() >= HAVE_CURRENT_DATA
                    && video.video_width() > 0
                    && video.video_height() > 0
            })
        }

        fn grab_frame(&mut self, divisor: u32) -> Option<Frame> {
            let video = self.video.as_ref()?;
            let (canvas, ctx) = self.canvas.as_ref()?;

            let divisor = divisor.max(1);
            let width = (video.video_width() / divisor).max(1);
            let height = (video.video_height() / divisor).max(1);
            if canvas.width() != width {
                canvas.set_width(width);
            }
            if canvas.height() != height {
                canvas.set_height(height);
            }

            ctx.draw_image_with_html_video_element_and_dw_and_dh(
                video,
                0.0,
                0.0,
                width as f64,
                height as f64,
            )
            .ok()?;
            let image = ctx
                .get_image_data(0.0, 0.0, width as f64, height as f64)
                .ok()?;
            Frame::from_rgba(image.width(), image.height(), image.data().0)
        }
    }

    impl Drop for WebCamera {
        fn drop(&mut self) {
            self.release();
        }
    }

    /// `{ facingMode: { exact|ideal }, width: { ideal, max }, height, frameRate }`
    fn video_constraints(c: &VideoConstraints) -> Result<JsValue, JsValue> {
        let facing = Object::new();
        let facing_key = if c.exact_facing { "exact" } else { "ideal" };
        Reflect::set(&facing, &facing_key.into(), &c.facing.as_str().into())?;

        let video = Object::new();
        Reflect::set(&video, &"facingMode".into(), &facing)?;
        Reflect::set(&video, &"width".into(), &range(c.ideal_width, c.max_width)?)?;
        Reflect::set(&video, &"height".into(), &range(c.ideal_height, c.max_height)?)?;
        Reflect::set(&video, &"frameRate".into(), &range(c.ideal_fps, c.max_fps)?)?;
        Ok(video.into())
    }

    fn range(ideal: u32, max: u32) -> Result<Object, JsValue> {
        let range = Object::new();
        Reflect::set(&range, &"ideal".into(), &ideal.into())?;
        Reflect::set(&range, &"max".into(), &max.into())?;
        Ok(range)
    }

    /// Maps a `getUserMedia` rejection to a cause the operator can act on.
    fn classify(err: JsValue) -> CameraError {
        let name = Reflect::get(&err, &"name".into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        debug!(%name, "getUserMedia rejected");
        match name.as_str() {
            "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
                CameraError::PermissionDenied
            }
            "NotFoundError" | "OverconstrainedError" | "DevicesNotFoundError" => {
                CameraError::NoCamera
            }
            _ => CameraError::Other(js_message(&err)),
        }
    }

    fn js_message(err: &JsValue) -> String {
        Reflect::get(err, &"message".into())
            .ok()
            .and_then(|v| v.as_string())
            .or_else(|| err.as_string())
            .unwrap_or_else(|| format!("{err:?}"))
    }

    fn element_by_id<T: JsCast>(id: &str) -> Option<T> {
        web_sys::window()?
            .document()?
            .get_element_by_id(id)
            .and_then(|element| element.dyn_into::<T>().ok())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod non_wasm32 {
    use crate::scanner::capture::{Camera, CameraError, VideoConstraints};
    use crate::scanner::frame::Frame;

    /// Placeholder for targets without camera support.
    pub struct NoCamera;

    impl NoCamera {
        pub fn new(_video_id: &str, _canvas_id: &str) -> Self {
            Self
        }
    }

    impl Camera for NoCamera {
        async fn open(&mut self, _constraints: &VideoConstraints) -> Result<(), CameraError> {
            Err(CameraError::Unsupported)
        }

        fn release(&mut self) {}

        fn is_open(&self) -> bool {
            false
        }

        fn frame_ready(&self) -> bool {
            false
        }

        fn grab_frame(&mut self, _divisor: u32) -> Option<Frame> {
            None
        }
    }
}
