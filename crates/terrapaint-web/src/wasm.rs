#![forbid(unsafe_code)]

use terrapaint_core::{
    Brush, Command, EngineConfig, FillColor, GroupId, MapView, Outcome, RegionId, Session,
    Transform,
};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, Response, SvgElement};

use crate::input::{InputEvent, InputRouter};

/// Selector for the shapes the user can assign.
const SHAPE_SELECTOR: &str = "#map-group path";
/// Selector for the element that receives the pan/zoom transform.
const GROUP_SELECTOR: &str = "#map-group";

fn js_error(message: impl AsRef<str>) -> JsValue {
    js_sys::Error::new(message.as_ref()).into()
}

/// Writes fills and transforms straight onto the DOM.
#[derive(Debug, Default)]
struct DomView {
    group: Option<Element>,
}

impl MapView<Element> for DomView {
    fn paint(&mut self, region: &RegionId, shape: &Element, fill: &FillColor) {
        let Some(svg) = shape.dyn_ref::<SvgElement>() else {
            return;
        };
        if svg.style().set_property("fill", fill.as_str()).is_err() {
            warn!(region = %region, "failed to set fill");
        }
    }

    fn apply_transform(&mut self, transform: &Transform) {
        if let Some(group) = &self.group
            && group
                .set_attribute("transform", &transform.to_svg_attribute())
                .is_err()
        {
            warn!("failed to set map transform");
        }
    }
}

/// Web map painter surface.
///
/// JS owns listener wiring and the status element; this type owns the
/// session. Every entry point that changes what the user sees returns the
/// status line to show, or `undefined` when it should stay as is.
#[wasm_bindgen]
pub struct TerrapaintWeb {
    session: Session<Element>,
    view: DomView,
    router: InputRouter,
    container: Option<Element>,
}

#[wasm_bindgen]
impl TerrapaintWeb {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Build from a JSON config document; missing fields take defaults.
    #[wasm_bindgen(js_name = withConfigJson)]
    pub fn with_config_json(json: &str) -> Result<TerrapaintWeb, JsValue> {
        let parse = EngineConfig::from_json_str(json).map_err(|err| js_error(err.to_string()))?;
        if let Some(err) = parse.errors.first() {
            return Err(js_error(err.to_string()));
        }
        Ok(Self::with_config(parse.config))
    }

    /// Fetch the SVG at `url`, inject it into `container`, and register its
    /// shapes. Calling it again swaps the map and discards the old state.
    ///
    /// Exported as an async JS function returning a Promise that resolves to
    /// the number of registered shapes.
    pub async fn init(&mut self, container: Element, url: String) -> Result<u32, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
        let response: Response = JsFuture::from(window.fetch_with_str(&url))
            .await?
            .dyn_into()?;
        if !response.ok() {
            return Err(js_error(format!(
                "map fetch failed: {} {}",
                response.status(),
                url
            )));
        }
        let text = JsFuture::from(response.text()?)
            .await?
            .as_string()
            .ok_or_else(|| js_error("map response is not text"))?;
        container.set_inner_html(&text);

        self.view.group = container.query_selector(GROUP_SELECTOR)?;
        let nodes = container.query_selector_all(SHAPE_SELECTOR)?;
        let mut shapes = Vec::with_capacity(nodes.length() as usize);
        for i in 0..nodes.length() {
            let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let id = element.id();
            if id.is_empty() {
                continue;
            }
            shapes.push((id, element));
        }

        // Old handles are detached now; a repeat init starts a fresh session.
        let report = self.session.replace_shapes(shapes, &mut self.view);
        self.router = InputRouter::default();
        debug!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            "map injected"
        );
        self.container = Some(container);
        Ok(u32::try_from(report.inserted).unwrap_or(u32::MAX))
    }

    /// Accepts one JSON-encoded input event (see `input::InputEventJson`).
    pub fn input(&mut self, event_json: &str) -> Result<Option<String>, JsValue> {
        let event = InputEvent::from_json_str(event_json).map_err(|err| js_error(err.to_string()))?;
        let mut status = None;
        for command in self.router.route(&event) {
            if let Some(line) = self.run(command)? {
                status = Some(line);
            }
        }
        Ok(status)
    }

    /// Brush a palette or imported group by id.
    #[wasm_bindgen(js_name = selectGroup)]
    pub fn select_group(&mut self, id: u32) -> Result<Option<String>, JsValue> {
        self.run(Command::Select(Brush::Group(GroupId::new(id))))
    }

    #[wasm_bindgen(js_name = selectEraser)]
    pub fn select_eraser(&mut self) -> Result<Option<String>, JsValue> {
        self.run(Command::Select(Brush::Erase))
    }

    /// Import save text; pass `null` when the prompt was declined.
    #[wasm_bindgen(js_name = importSave)]
    pub fn import_save(&mut self, text: Option<String>) -> Result<Option<String>, JsValue> {
        self.run(Command::Import(text))
    }

    /// Current ownership as save JSON.
    #[wasm_bindgen(js_name = exportSave)]
    pub fn export_save(&mut self) -> Result<String, JsValue> {
        match self.dispatch(Command::Export)? {
            Outcome::Exported { text, .. } => Ok(text),
            other => Err(js_error(format!("unexpected outcome: {other:?}"))),
        }
    }

    /// Live groups as a JSON array of `{id, name, color, size}`.
    #[wasm_bindgen(js_name = groupsJson)]
    pub fn groups_json(&self) -> String {
        let groups: Vec<serde_json::Value> = self
            .session
            .map()
            .groups()
            .map(|g| {
                serde_json::json!({
                    "id": g.id().get(),
                    "name": g.name(),
                    "color": g.color().as_str(),
                    "size": g.len(),
                })
            })
            .collect();
        serde_json::Value::Array(groups).to_string()
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&mut self) -> Result<(), JsValue> {
        self.dispatch(Command::ResetView).map(|_| ())
    }

    /// Explicit teardown for JS callers. Drops DOM references so the injected
    /// map can be reclaimed.
    pub fn destroy(&mut self) {
        if let Some(container) = self.container.take() {
            container.set_inner_html("");
        }
        self.view.group = None;
        self.session = Session::new(self.session.config().clone());
        self.router = InputRouter::default();
    }
}

impl TerrapaintWeb {
    fn with_config(config: EngineConfig) -> Self {
        Self {
            session: Session::new(config),
            view: DomView::default(),
            router: InputRouter::default(),
            container: None,
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Outcome, JsValue> {
        self.session
            .dispatch(command, &mut self.view)
            .map_err(|err| js_error(err.to_string()))
    }

    fn run(&mut self, command: Command) -> Result<Option<String>, JsValue> {
        let outcome = self.dispatch(command)?;
        Ok(outcome.has_status().then(|| outcome.to_string()))
    }
}
