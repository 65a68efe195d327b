use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown render mode \"{0}\", expected one of text, canvas_2d, html")]
    UnknownRenderMode(String),

    #[error("Cannot find element with id containerId=\"{0}\"")]
    ContainerNotFound(String),

    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("render buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("simulation failed to load: {0}")]
    Load(String),

    #[error("host error: {0}")]
    Host(String),
}

impl BridgeError {
    /// Errors raised synchronously while constructing a bridge from options.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownRenderMode(_)
                | BridgeError::ContainerNotFound(_)
                | BridgeError::Options(_)
        )
    }
}

#[cfg(feature = "wasm")]
impl From<wasm_bindgen::JsValue> for BridgeError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&value, &"message".into())
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));

        BridgeError::Host(message)
    }
}

#[cfg(feature = "wasm")]
impl From<BridgeError> for wasm_bindgen::JsValue {
    fn from(error: BridgeError) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}
