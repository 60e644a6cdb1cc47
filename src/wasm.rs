use wasm_bindgen::prelude::*;

/// Lay out a template against data, both JSON, and return the layout as JSON.
#[wasm_bindgen]
pub fn layout_json(template_json: &str, data_json: &str) -> Result<String, JsValue> {
    let result = crate::layout_json(template_json, data_json)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&result).map_err(|e| JsValue::from_str(&format!("serialize error: {e}")))
}
