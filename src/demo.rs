//! A small host library exposed through the bridge: geometry points and a
//! toy document with elements, node lists and attribute maps.
use crate::{
    bridge::{Bridge, Scope},
    error::BridgeError,
    types::{HostClass, HostError, HostOperation, TypeHandle, ValueKind},
    utils::sync::{Arc, AtomicUsize, Mutex, OnceLock, Ordering},
    value::{
        coercion, AdapterSlot, HostObject, HostObjectRef, HostValue, ScriptObject, ScriptObjectOps,
        ScriptValue,
    },
};
use serde::Serialize;
use std::{any::Any, collections::BTreeMap};
use tracing::info;

pub const GEOMETRY_NAMESPACE: &str = "demo.geom";
pub const WEB_NAMESPACE: &str = "demo.web";

fn string_arg(args: &[HostValue], index: usize, what: &str) -> Result<String, HostError> {
    args.get(index)
        .and_then(HostValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| HostError::new(format!("{what} must be a string")))
}

fn int_arg(args: &[HostValue], index: usize) -> i32 {
    args.get(index).and_then(HostValue::as_i32).unwrap_or(0)
}

fn optional_text(value: Option<String>) -> HostValue {
    value.map_or(HostValue::Null, HostValue::Str)
}

// ============================================================================
// Point
// ============================================================================

#[derive(Debug, Default)]
pub struct Point {
    x: Mutex<i32>,
    y: Mutex<i32>,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: Mutex::new(x),
            y: Mutex::new(y),
        }
    }

    pub fn x(&self) -> i32 {
        *self.x.lock()
    }

    pub fn y(&self) -> i32 {
        *self.y.lock()
    }

    pub fn set_x(&self, x: i32) {
        *self.x.lock() = x;
    }

    pub fn set_y(&self, y: i32) {
        *self.y.lock() = y;
    }

    pub fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("Point")
                    .namespace(GEOMETRY_NAMESPACE)
                    .constructor(|| Ok(Arc::new(Point::default()) as HostObjectRef))
                    .operation(HostOperation::instance::<Point, _>("getX", &[], ValueKind::Int, |p, _| {
                        Ok(HostValue::Int(p.x()))
                    }))
                    .operation(HostOperation::instance::<Point, _>(
                        "setX",
                        &[ValueKind::Int],
                        ValueKind::Void,
                        |p, args| {
                            p.set_x(int_arg(args, 0));
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Point, _>("getY", &[], ValueKind::Int, |p, _| {
                        Ok(HostValue::Int(p.y()))
                    }))
                    .operation(HostOperation::instance::<Point, _>(
                        "setY",
                        &[ValueKind::Int],
                        ValueKind::Void,
                        |p, args| {
                            p.set_y(int_arg(args, 0));
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Point, _>(
                        "translate",
                        &[ValueKind::Int, ValueKind::Int],
                        ValueKind::Void,
                        |p, args| {
                            p.set_x(p.x() + int_arg(args, 0));
                            p.set_y(p.y() + int_arg(args, 1));
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Point, _>(
                        "distanceTo",
                        &[ValueKind::Any],
                        ValueKind::Double,
                        |p, args| {
                            let other = args
                                .first()
                                .and_then(HostValue::as_object)
                                .and_then(|o| o.downcast_ref::<Point>())
                                .ok_or_else(|| HostError::new("distanceTo expects a Point"))?;
                            let dx = f64::from(p.x() - other.x());
                            let dy = f64::from(p.y() - other.y());
                            Ok(HostValue::Double(dx.hypot(dy)))
                        },
                    ))
                    .static_field("ORIGIN_X", HostValue::Int(0), true)
                    .build()
            })
            .clone()
    }
}

impl HostObject for Point {
    fn host_type(&self) -> TypeHandle {
        Point::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        format!("Point({}, {})", self.x(), self.y())
    }
}

// ============================================================================
// AttributeMap
// ============================================================================

#[derive(Debug, Default)]
pub struct AttributeMap {
    entries: Mutex<BTreeMap<String, String>>,
}

impl AttributeMap {
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.lock().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: &str) {
        self.entries.lock().insert(name.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("AttributeMap")
                    .namespace(WEB_NAMESPACE)
                    .operation(HostOperation::instance::<AttributeMap, _>(
                        "namedItem",
                        &[ValueKind::String],
                        ValueKind::String,
                        |map, args| Ok(optional_text(map.get(&string_arg(args, 0, "attribute name")?))),
                    ))
                    .operation(HostOperation::instance::<AttributeMap, _>(
                        "setNamedItem",
                        &[ValueKind::String, ValueKind::String],
                        ValueKind::Void,
                        |map, args| {
                            let name = string_arg(args, 0, "attribute name")?;
                            let value = match args.get(1) {
                                Some(HostValue::Str(s)) => s.clone(),
                                _ => String::new(),
                            };
                            map.set(&name, &value);
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<AttributeMap, _>(
                        "getLength",
                        &[],
                        ValueKind::Int,
                        |map, _| Ok(HostValue::Int(map.len() as i32)),
                    ))
                    .build()
            })
            .clone()
    }
}

impl HostObject for AttributeMap {
    fn host_type(&self) -> TypeHandle {
        AttributeMap::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Element
// ============================================================================

/// A self-describing host value: it carries its own adapter slot.
#[derive(Debug)]
pub struct Element {
    slot: AdapterSlot,
    tag_name: String,
    id: Mutex<String>,
    text: Mutex<String>,
    attributes: Arc<AttributeMap>,
}

impl Element {
    pub fn new(tag_name: &str) -> Self {
        Self {
            slot: AdapterSlot::new(),
            tag_name: tag_name.to_ascii_uppercase(),
            id: Mutex::new(String::new()),
            text: Mutex::new(String::new()),
            attributes: Arc::new(AttributeMap::default()),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn attributes(&self) -> &Arc<AttributeMap> {
        &self.attributes
    }

    /// Lets go of the adapter this element holds for scripts.
    pub fn detach(&self) -> bool {
        self.slot.clear()
    }

    pub fn is_attached(&self) -> bool {
        self.slot.is_occupied()
    }

    pub fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("Element")
                    .namespace(WEB_NAMESPACE)
                    .operation(HostOperation::instance::<Element, _>(
                        "getTagName",
                        &[],
                        ValueKind::String,
                        |e, _| Ok(HostValue::Str(e.tag_name.clone())),
                    ))
                    .operation(HostOperation::instance::<Element, _>("getId", &[], ValueKind::String, |e, _| {
                        Ok(HostValue::Str(e.id.lock().clone()))
                    }))
                    .operation(HostOperation::instance::<Element, _>(
                        "setId",
                        &[ValueKind::String],
                        ValueKind::Void,
                        |e, args| {
                            *e.id.lock() = args.first().and_then(HostValue::as_str).unwrap_or_default().to_string();
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Element, _>(
                        "getTextContent",
                        &[],
                        ValueKind::String,
                        |e, _| Ok(HostValue::Str(e.text.lock().clone())),
                    ))
                    .operation(HostOperation::instance::<Element, _>(
                        "setTextContent",
                        &[ValueKind::String],
                        ValueKind::Void,
                        |e, args| {
                            *e.text.lock() = args.first().and_then(HostValue::as_str).unwrap_or_default().to_string();
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Element, _>(
                        "getAttributes",
                        &[],
                        ValueKind::Object(AttributeMap::host_class()),
                        |e, _| Ok(HostValue::Object(e.attributes.clone())),
                    ))
                    .operation(HostOperation::instance::<Element, _>(
                        "getAttribute",
                        &[ValueKind::String],
                        ValueKind::String,
                        |e, args| Ok(optional_text(e.attributes.get(&string_arg(args, 0, "attribute name")?))),
                    ))
                    .operation(HostOperation::instance::<Element, _>(
                        "setAttribute",
                        &[ValueKind::String, ValueKind::String],
                        ValueKind::Void,
                        |e, args| {
                            let name = string_arg(args, 0, "attribute name")?;
                            let value = string_arg(args, 1, "attribute value").unwrap_or_default();
                            e.attributes.set(&name, &value);
                            Ok(HostValue::Null)
                        },
                    ))
                    .build()
            })
            .clone()
    }
}

impl HostObject for Element {
    fn host_type(&self) -> TypeHandle {
        Element::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        let id = self.id.lock();
        if id.is_empty() {
            format!("<{}>", self.tag_name.to_ascii_lowercase())
        } else {
            format!("<{} id=\"{}\">", self.tag_name.to_ascii_lowercase(), id)
        }
    }

    fn as_text(&self) -> Option<String> {
        Some(self.text.lock().clone())
    }

    fn adapter_slot(&self) -> Option<&AdapterSlot> {
        Some(&self.slot)
    }
}

// ============================================================================
// NodeList
// ============================================================================

#[derive(Default)]
pub struct NodeList {
    nodes: Vec<HostObjectRef>,
}

impl NodeList {
    pub fn new(nodes: Vec<HostObjectRef>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("NodeList")
                    .namespace(WEB_NAMESPACE)
                    .operation(HostOperation::instance::<NodeList, _>(
                        "item",
                        &[ValueKind::Int],
                        ValueKind::Any,
                        |list, args| {
                            let node = usize::try_from(int_arg(args, 0))
                                .ok()
                                .and_then(|i| list.nodes.get(i));
                            Ok(node.map_or(HostValue::Null, |n| HostValue::Object(n.clone())))
                        },
                    ))
                    .operation(HostOperation::instance::<NodeList, _>(
                        "getLength",
                        &[],
                        ValueKind::Int,
                        |list, _| Ok(HostValue::Int(list.nodes.len() as i32)),
                    ))
                    .build()
            })
            .clone()
    }
}

impl HostObject for NodeList {
    fn host_type(&self) -> TypeHandle {
        NodeList::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug)]
pub struct Document {
    title: Mutex<String>,
    url: String,
    elements: Mutex<Vec<Arc<Element>>>,
    created: AtomicUsize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl Document {
    pub const ELEMENT_NODE: i32 = 1;
    pub const TEXT_NODE: i32 = 3;

    pub fn new(url: &str) -> Self {
        Self {
            title: Mutex::new(String::new()),
            url: url.to_string(),
            elements: Mutex::new(vec![]),
            created: AtomicUsize::new(0),
        }
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn create_element(&self, tag_name: &str) -> Arc<Element> {
        let element = Arc::new(Element::new(tag_name));
        self.elements.lock().push(element.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        element
    }

    /// Removes `element` from the document and detaches its adapter.
    pub fn remove_element(&self, element: &Element) -> bool {
        let mut elements = self.elements.lock();
        let Some(position) = elements.iter().position(|e| std::ptr::eq(e.as_ref(), element)) else {
            return false;
        };
        let removed = elements.remove(position);
        drop(elements);
        removed.detach();
        true
    }

    pub fn element_count(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn host_class() -> TypeHandle {
        static CLASS: OnceLock<TypeHandle> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                HostClass::builder("Document")
                    .namespace(WEB_NAMESPACE)
                    .constructor(|| Ok(Arc::new(Document::default()) as HostObjectRef))
                    .operation(HostOperation::instance::<Document, _>(
                        "getTitle",
                        &[],
                        ValueKind::String,
                        |d, _| Ok(HostValue::Str(d.title())),
                    ))
                    .operation(HostOperation::instance::<Document, _>(
                        "setTitle",
                        &[ValueKind::String],
                        ValueKind::Void,
                        |d, args| {
                            *d.title.lock() = args.first().and_then(HostValue::as_str).unwrap_or_default().to_string();
                            Ok(HostValue::Null)
                        },
                    ))
                    .operation(HostOperation::instance::<Document, _>("getURL", &[], ValueKind::String, |d, _| {
                        Ok(HostValue::Str(d.url.clone()))
                    }))
                    .operation(HostOperation::instance::<Document, _>(
                        "createElement",
                        &[ValueKind::String],
                        ValueKind::Object(Element::host_class()),
                        |d, args| {
                            let tag = string_arg(args, 0, "tag name")?;
                            Ok(HostValue::Object(d.create_element(&tag)))
                        },
                    ))
                    .operation(HostOperation::instance::<Document, _>(
                        "removeElement",
                        &[ValueKind::Object(Element::host_class())],
                        ValueKind::Bool,
                        |d, args| {
                            let element = args
                                .first()
                                .and_then(HostValue::as_object)
                                .and_then(|o| o.downcast_ref::<Element>());
                            Ok(HostValue::Bool(element.is_some_and(|e| d.remove_element(e))))
                        },
                    ))
                    .operation(HostOperation::instance::<Document, _>(
                        "getElementCount",
                        &[],
                        ValueKind::Int,
                        |d, _| Ok(HostValue::Int(d.element_count() as i32)),
                    ))
                    .operation(HostOperation::instance::<Document, _>(
                        "getElements",
                        &[],
                        ValueKind::Object(NodeList::host_class()),
                        |d, _| {
                            let nodes = d
                                .elements
                                .lock()
                                .iter()
                                .map(|e| e.clone() as HostObjectRef)
                                .collect();
                            Ok(HostValue::Object(Arc::new(NodeList::new(nodes))))
                        },
                    ))
                    .operation(HostOperation::static_fn(
                        "escape",
                        &[ValueKind::String],
                        ValueKind::String,
                        |args| {
                            let text = args.first().and_then(HostValue::as_str).unwrap_or_default();
                            Ok(HostValue::Str(
                                text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"),
                            ))
                        },
                    ))
                    .operation(HostOperation::script("format", |args| {
                        let parts: Vec<_> = args.iter().map(coercion::to_text).collect();
                        Ok(ScriptValue::Str(parts.join(" ")))
                    }))
                    .static_field("ELEMENT_NODE", HostValue::Int(Document::ELEMENT_NODE), true)
                    .static_field("TEXT_NODE", HostValue::Int(Document::TEXT_NODE), true)
                    .build()
            })
            .clone()
    }
}

impl HostObject for Document {
    fn host_type(&self) -> TypeHandle {
        Document::host_class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        format!("[Document {}]", self.url)
    }
}

/// Every class the demo library registers.
pub fn classes() -> Vec<TypeHandle> {
    vec![
        Point::host_class(),
        Document::host_class(),
        Element::host_class(),
        NodeList::host_class(),
        AttributeMap::host_class(),
    ]
}

/// Looks a demo class up by simple or fully qualified name.
pub fn find_class(name: &str) -> Option<TypeHandle> {
    classes()
        .into_iter()
        .find(|ty| ty.name() == name || ty.full_name() == name)
}

// ============================================================================
// Churn workload
// ============================================================================

/// Calls the method `name` on a scripting object, the way a script would.
pub fn call_method(
    target: &ScriptObject,
    name: &str,
    args: &[ScriptValue],
    scope: &Scope,
) -> Result<ScriptValue, BridgeError> {
    match target.get(name, scope)? {
        ScriptValue::Object(function) => {
            function.call(&ScriptValue::Object(target.clone()), args, scope)
        }
        _ => Err(BridgeError::NotCallable(name.to_string())),
    }
}

fn expect_object(value: ScriptValue, what: &str) -> Result<ScriptObject, BridgeError> {
    match value {
        ScriptValue::Object(object) => Ok(object),
        other => Err(BridgeError::Coercion {
            from: other.type_name().to_string(),
            to: what.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChurnReport {
    pub iterations: usize,
    pub elements_created: usize,
    pub elements_attached: usize,
    pub swept: usize,
    pub live_adapters: usize,
}

/// Creates, touches and discards `count` elements and points through the
/// bridge, then reports how many adapters survived.
pub fn churn(bridge: &Bridge, count: usize) -> Result<ChurnReport, BridgeError> {
    let scope = Scope::new("churn");
    let document = Arc::new(Document::new("about:churn"));
    let point_class = bridge.constructor_for(&Point::host_class())?;
    let point_class = expect_object(point_class, "Point constructor")?;

    {
        let doc = expect_object(
            bridge.expose_to_script(HostValue::Object(document.clone()), &scope)?,
            "Document",
        )?;
        for i in 0..count {
            let element = call_method(&doc, "createElement", &[ScriptValue::from("div")], &scope)?;
            let element_object = expect_object(element.clone(), "Element")?;
            element_object.put("id", ScriptValue::Str(format!("e{i}")), &scope)?;
            element_object.put("scratch", ScriptValue::Int(i as i64), &scope)?;

            let point = expect_object(point_class.construct(&[], &scope)?, "Point")?;
            point.put("x", ScriptValue::Int(i as i64), &scope)?;

            call_method(&doc, "removeElement", &[element], &scope)?;
        }
    }

    let swept = bridge.sweep();
    let report = ChurnReport {
        iterations: count,
        elements_created: document.created_count(),
        elements_attached: document.element_count(),
        swept,
        live_adapters: bridge.live_adapters(),
    };
    info!(?report, "churn finished");
    Ok(report)
}
