//! Browser façade.
//!
//! `GridHandle` owns one grid, persists presentation state to
//! `localStorage`, and talks to the server through a JS object whose methods
//! return Promises:
//!
//! ```javascript
//! const source = {
//!   fetchPage: ({ params, pageToken, pageSize }) => api.page(...),
//!   createRow: (payload) => api.create(payload),
//!   updateRow: ({ id, patch }) => api.update(id, patch),
//!   deleteRows: (ids) => api.delete(ids),
//! };
//! const grid = new GridHandle("leads", "{}", source, null);
//! grid.setOnChange(() => paint(grid.snapshot()));
//! await grid.loadMore();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local, JsFuture};

use crate::column::presets::{lead_columns, listing_columns};
use crate::column::ColumnSet;
use crate::config::GridConfig;
use crate::data::{Annotator, DataLayer, DataSource};
use crate::editor::{EditEvent, EditKey, EditOutcome};
use crate::error::{GridError, Result};
use crate::grid::{settle_commit, settle_delete, DataGrid};
use crate::header::PopoverKind;
use crate::state::LocalStorageStore;
use crate::types::{Page, QueryParams, Row, RowId};

fn js_err(e: &JsValue) -> GridError {
    GridError::Other(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

fn method(obj: &JsValue, name: &str) -> std::result::Result<Function, JsValue> {
    Reflect::get(obj, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("data source is missing {name}()")))
}

/// Plain JS objects rather than `Map`s for JSON maps.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| GridError::Other(e.to_string()))
}

/// Call `f(arg)` and await the returned Promise.
async fn call_async<T: Serialize + ?Sized>(f: &Function, arg: &T) -> Result<JsValue> {
    let arg = to_js(arg)?;
    let ret = f.call1(&JsValue::NULL, &arg).map_err(|e| js_err(&e))?;
    JsFuture::from(Promise::resolve(&ret))
        .await
        .map_err(|e| js_err(&e))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| GridError::Other(e.to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchArgs<'a> {
    params: &'a QueryParams,
    page_token: Option<&'a str>,
    page_size: usize,
}

#[derive(Serialize)]
struct UpdateArgs<'a> {
    id: &'a RowId,
    patch: &'a Map<String, Value>,
}

/// [`DataSource`] backed by Promise-returning JS callbacks.
struct JsDataSource {
    fetch_page: Function,
    create_row: Function,
    update_row: Function,
    delete_rows: Function,
}

impl JsDataSource {
    fn from_object(obj: &JsValue) -> std::result::Result<Self, JsValue> {
        Ok(Self {
            fetch_page: method(obj, "fetchPage")?,
            create_row: method(obj, "createRow")?,
            update_row: method(obj, "updateRow")?,
            delete_rows: method(obj, "deleteRows")?,
        })
    }
}

#[async_trait(?Send)]
impl DataSource for JsDataSource {
    async fn fetch_page(
        &self,
        params: &QueryParams,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<Page> {
        let args = FetchArgs {
            params,
            page_token,
            page_size,
        };
        let value = call_async(&self.fetch_page, &args)
            .await
            .map_err(|e| GridError::Fetch(e.to_string()))?;
        from_js(value)
    }

    async fn create_row(&self, payload: Map<String, Value>) -> Result<Row> {
        from_js(call_async(&self.create_row, &payload).await?)
    }

    async fn update_row(&self, id: &RowId, patch: Map<String, Value>) -> Result<Row> {
        let args = UpdateArgs { id, patch: &patch };
        from_js(call_async(&self.update_row, &args).await?)
    }

    async fn delete_rows(&self, ids: &[RowId]) -> Result<()> {
        call_async(&self.delete_rows, ids).await?;
        Ok(())
    }
}

/// [`Annotator`] backed by a Promise-returning JS callback.
struct JsAnnotator {
    callback: Function,
}

#[async_trait(?Send)]
impl Annotator for JsAnnotator {
    async fn fetch_derived_annotation(&self, row: &Row) -> Result<Value> {
        from_js(call_async(&self.callback, row).await?)
    }
}

fn preset(name: &str) -> std::result::Result<ColumnSet, JsValue> {
    match name {
        "leads" => Ok(lead_columns()),
        "listings" => Ok(listing_columns()),
        other => Err(JsValue::from_str(&format!("unknown grid preset: {other}"))),
    }
}

type SharedGrid = Rc<RefCell<DataGrid<LocalStorageStore>>>;

/// One grid bound to a JS data source.
#[wasm_bindgen]
pub struct GridHandle {
    grid: SharedGrid,
    on_change: Rc<RefCell<Option<Function>>>,
}

#[wasm_bindgen]
impl GridHandle {
    /// `preset` is `"leads"` or `"listings"`; `config_json` may be `"{}"`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        preset_name: &str,
        config_json: &str,
        data_source: JsValue,
        annotator: Option<Function>,
    ) -> std::result::Result<GridHandle, JsValue> {
        console_error_panic_hook::set_once();
        let mut config = GridConfig::from_json(config_json)?;
        if config.table_name == GridConfig::default().table_name {
            config.table_name = preset_name.to_string();
        }
        let columns = preset(preset_name)?;
        let source: Rc<dyn DataSource> = Rc::new(JsDataSource::from_object(&data_source)?);
        let mut data = DataLayer::new(&config, source);
        if let Some(callback) = annotator {
            data = data.with_annotator(Rc::new(JsAnnotator { callback }));
        }
        let grid = DataGrid::new(config, columns, LocalStorageStore::new(), data);
        Ok(Self {
            grid: Rc::new(RefCell::new(grid)),
            on_change: Rc::new(RefCell::new(None)),
        })
    }

    /// Called after every async state change (page landed, mutation settled).
    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.on_change.borrow_mut() = callback;
    }

    /// Header, body, layout and status for painting.
    pub fn snapshot(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(to_js(&self.grid.borrow().snapshot())?)
    }

    /// Load the first page, or the next one when the sentinel is visible.
    /// Resolves to `true` if a page was fetched.
    #[wasm_bindgen(js_name = loadMore)]
    pub fn load_more(&self) -> Promise {
        let (data, params) = {
            let grid = self.grid.borrow();
            (grid.data().clone(), grid.params())
        };
        let notify = Rc::clone(&self.on_change);
        future_to_promise(async move {
            let result = data.fetch_next_page(&params).await;
            fire(&notify);
            Ok(JsValue::from_bool(result?))
        })
    }

    /// Re-enable auto-loading after a failed fetch.
    pub fn retry(&self) -> Promise {
        self.grid.borrow().retry();
        self.load_more()
    }

    #[wasm_bindgen(js_name = headerPointerDown)]
    pub fn header_pointer_down(&self, x: f32) {
        self.grid.borrow_mut().header_pointer_down(x);
    }

    #[wasm_bindgen(js_name = headerPointerMove)]
    pub fn header_pointer_move(&self, x: f32) {
        self.grid.borrow_mut().header_pointer_move(x);
    }

    #[wasm_bindgen(js_name = headerPointerUp)]
    pub fn header_pointer_up(&self, x: f32) -> std::result::Result<(), JsValue> {
        Ok(self.grid.borrow_mut().header_pointer_up(x)?)
    }

    #[wasm_bindgen(js_name = clickSort)]
    pub fn click_sort(&self, key: &str) -> std::result::Result<(), JsValue> {
        Ok(self.grid.borrow_mut().click_sort(key)?)
    }

    /// `kind` is `"sort"` or `"filter"`.
    #[wasm_bindgen(js_name = togglePopover)]
    pub fn toggle_popover(&self, key: &str, kind: &str) -> std::result::Result<(), JsValue> {
        let kind = match kind {
            "sort" => PopoverKind::Sort,
            "filter" => PopoverKind::Filter,
            other => return Err(JsValue::from_str(&format!("unknown popover: {other}"))),
        };
        Ok(self.grid.borrow_mut().toggle_popover(key, kind)?)
    }

    #[wasm_bindgen(js_name = toggleFilterChoice)]
    pub fn toggle_filter_choice(&self, value: &str) {
        self.grid.borrow_mut().toggle_filter_choice(value);
    }

    #[wasm_bindgen(js_name = applyFilter)]
    pub fn apply_filter(&self) -> std::result::Result<Promise, JsValue> {
        self.grid.borrow_mut().apply_filter_draft()?;
        Ok(self.load_more())
    }

    #[wasm_bindgen(js_name = documentClick)]
    pub fn document_click(&self, inside_popover: bool, inside_editor: bool) {
        self.grid
            .borrow_mut()
            .document_click(inside_popover, inside_editor);
    }

    #[wasm_bindgen(js_name = setSearchQuery)]
    pub fn set_search_query(&self, text: &str) {
        self.grid.borrow_mut().set_search_query(text);
    }

    /// Apply staged search text; loads the new query's first page.
    #[wasm_bindgen(js_name = commitSearch)]
    pub fn commit_search(&self) -> Promise {
        self.grid.borrow_mut().commit_search();
        self.load_more()
    }

    #[wasm_bindgen(js_name = toggleRowSelection)]
    pub fn toggle_row_selection(&self, id: &str) {
        self.grid.borrow_mut().toggle_row_selection(&RowId::new(id));
    }

    #[wasm_bindgen(js_name = toggleColumnVisibility)]
    pub fn toggle_column_visibility(&self, key: &str) -> std::result::Result<(), JsValue> {
        Ok(self.grid.borrow_mut().toggle_column_visibility(key)?)
    }

    #[wasm_bindgen(js_name = toggleColumnPinned)]
    pub fn toggle_column_pinned(&self, key: &str) -> std::result::Result<(), JsValue> {
        Ok(self.grid.borrow_mut().toggle_column_pinned(key)?)
    }

    #[wasm_bindgen(js_name = resetColumns)]
    pub fn reset_columns(&self) {
        self.grid.borrow_mut().reset_columns();
    }

    #[wasm_bindgen(js_name = clickCell)]
    pub fn click_cell(&self, row_id: &str, key: &str) -> std::result::Result<(), JsValue> {
        Ok(self.grid.borrow_mut().click_cell(&RowId::new(row_id), key)?)
    }

    /// `key` is the DOM `KeyboardEvent.key`.
    #[wasm_bindgen(js_name = editKey)]
    pub fn edit_key(&self, key: &str) -> JsValue {
        let key = match key {
            "Enter" => EditKey::Enter,
            "Escape" => EditKey::Escape,
            _ => EditKey::Other,
        };
        self.deliver(EditEvent::Key(key))
    }

    #[wasm_bindgen(js_name = editInput)]
    pub fn edit_input(&self, text: &str) -> JsValue {
        self.deliver(EditEvent::Input(text))
    }

    #[wasm_bindgen(js_name = editField)]
    pub fn edit_field(&self, field: &str, text: &str) -> JsValue {
        self.deliver(EditEvent::FieldInput { field, text })
    }

    #[wasm_bindgen(js_name = editOption)]
    pub fn edit_option(&self, value: &str) -> JsValue {
        self.deliver(EditEvent::OptionClicked(value))
    }

    #[wasm_bindgen(js_name = editSave)]
    pub fn edit_save(&self) -> JsValue {
        self.deliver(EditEvent::SaveClicked)
    }

    #[wasm_bindgen(js_name = editCancel)]
    pub fn edit_cancel(&self) -> JsValue {
        self.deliver(EditEvent::CancelClicked)
    }

    /// Add a client-only row; its first edit creates it on the server.
    #[wasm_bindgen(js_name = addRow)]
    pub fn add_row(&self, fields: JsValue) -> std::result::Result<String, JsValue> {
        let fields: Map<String, Value> = if fields.is_undefined() || fields.is_null() {
            Map::new()
        } else {
            from_js(fields)?
        };
        Ok(self.grid.borrow_mut().add_phantom_row(fields).to_string())
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&self) -> Promise {
        let (data, ids) = {
            let mut grid = self.grid.borrow_mut();
            let ids = grid.selected_ids();
            grid.clear_selection();
            (grid.data().clone(), ids)
        };
        let notify = Rc::clone(&self.on_change);
        future_to_promise(async move {
            let result = settle_delete(data, ids).await;
            fire(&notify);
            result?;
            Ok(JsValue::UNDEFINED)
        })
    }
}

impl GridHandle {
    /// Deliver an edit event; a commit is dispatched in the background.
    /// Returns the validation message when the edit was rejected.
    fn deliver(&self, event: EditEvent<'_>) -> JsValue {
        let outcome = self.grid.borrow_mut().edit_event(event);
        match outcome {
            EditOutcome::Committed(commit) => {
                let data = self.grid.borrow().data().clone();
                let notify = Rc::clone(&self.on_change);
                spawn_local(async move {
                    if let Err(e) = settle_commit(data, commit).await {
                        log::warn!("{e}");
                    }
                    fire(&notify);
                });
                JsValue::NULL
            }
            EditOutcome::Rejected(e) => JsValue::from_str(&e.to_string()),
            EditOutcome::Ignored
            | EditOutcome::Updated
            | EditOutcome::Cancelled => JsValue::NULL,
        }
    }
}

fn fire(callback: &Rc<RefCell<Option<Function>>>) {
    let callback = callback.borrow().clone();
    if let Some(f) = callback {
        if let Err(e) = f.call0(&JsValue::NULL) {
            log::warn!("onChange callback threw: {e:?}");
        }
    }
}

/// Install the console logger at `level` (`"debug"`, `"info"`, `"warn"`...).
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) -> std::result::Result<(), JsValue> {
    let level = level.parse().unwrap_or(log::LevelFilter::Info);
    Ok(crate::logging::init(level)?)
}
