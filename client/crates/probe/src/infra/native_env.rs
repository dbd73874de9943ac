//! Native Environment
//!
//! Host-backed [`BrowserEnvironment`]. A native process has no screen and
//! no GPU surface, so canvas and WebGL report as absent.

use std::env::consts::{ARCH, OS};

use platform::host;

use crate::domain::ports::{BrowserEnvironment, Canvas2d, WebGlContext};
use crate::domain::value_objects::{BrowserInfo, ScreenInfo, TimezoneInfo, WebGlParameter};
use crate::error::ProbeResult;
use crate::infra::offline_audio::OfflineAudioContext;

const FALLBACK_LANGUAGE: &str = "en-US";
const FALLBACK_ZONE: &str = "UTC";

/// Surface type of a headless host; it cannot be constructed
#[derive(Debug)]
pub enum Headless {}

impl Canvas2d for Headless {
    fn resize(&mut self, _width: u32, _height: u32) {
        match *self {}
    }

    fn set_text_baseline(&mut self, _baseline: &str) {
        match *self {}
    }

    fn set_font(&mut self, _font: &str) {
        match *self {}
    }

    fn set_fill_style(&mut self, _style: &str) {
        match *self {}
    }

    fn fill_rect(&mut self, _x: f64, _y: f64, _width: f64, _height: f64) {
        match *self {}
    }

    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64) -> ProbeResult<()> {
        match *self {}
    }

    fn to_data_url(&self) -> ProbeResult<String> {
        match *self {}
    }
}

impl WebGlContext for Headless {
    fn has_extension(&self, _name: &str) -> bool {
        match *self {}
    }

    fn parameter(&self, _parameter: WebGlParameter) -> ProbeResult<String> {
        match *self {}
    }
}

/// Environment facts read from the local host
#[derive(Debug, Clone)]
pub struct NativeEnvironment {
    user_agent: String,
}

impl NativeEnvironment {
    pub fn new() -> Self {
        Self {
            user_agent: format!("leakprobe/{} ({}; {})", env!("CARGO_PKG_VERSION"), OS, ARCH),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for NativeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserEnvironment for NativeEnvironment {
    type Canvas = Headless;
    type WebGl = Headless;
    type Audio = OfflineAudioContext;

    fn browser(&self) -> BrowserInfo {
        let language = host::primary_language().unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
        let languages = host::preferred_languages(Some(language.as_str()));

        BrowserInfo {
            user_agent: self.user_agent.clone(),
            language,
            languages,
            platform: host::platform_name(),
            cookie_enabled: false,
            on_line: host::has_default_route(),
            hardware_concurrency: host::hardware_concurrency(),
        }
    }

    fn screen(&self) -> ScreenInfo {
        ScreenInfo::default()
    }

    fn timezone(&self) -> TimezoneInfo {
        TimezoneInfo {
            offset: host::timezone_offset_minutes(),
            zone: host::timezone_name().unwrap_or_else(|| FALLBACK_ZONE.to_string()),
        }
    }

    fn create_canvas(&self) -> ProbeResult<Option<Headless>> {
        Ok(None)
    }

    fn create_webgl_context(&self) -> ProbeResult<Option<Headless>> {
        Ok(None)
    }

    fn create_audio_context(&self) -> ProbeResult<Option<OfflineAudioContext>> {
        Ok(Some(OfflineAudioContext::new()))
    }
}
