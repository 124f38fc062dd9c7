//! Conversion table from task kinds to remote methods.
//!
//! Each [`TaskKind`] an endpoint may serve is registered with a
//! [`Conversion`]: the remote method to invoke, a function that packs a
//! domain request into the wire payload, and an optional function that
//! unpacks the wire response. Kinds without a registered conversion fail
//! with [`ClientError::UnknownTaskKind`](crate::ClientError::UnknownTaskKind)
//! before any network activity.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;
use crate::types::{QueryOptions, TaskKind};

/// Packs a domain request and its options into a wire payload.
pub type PackFn =
    Arc<dyn Fn(&Value, &QueryOptions) -> Result<Value, ConversionError> + Send + Sync>;

/// Unpacks a wire response into a domain result.
pub type UnpackFn = Arc<dyn Fn(Value) -> Result<Value, ConversionError> + Send + Sync>;

/// How one task kind is sent over the wire.
#[derive(Clone)]
pub struct Conversion {
    method: String,
    pack: PackFn,
    unpack: Option<UnpackFn>,
}

impl Conversion {
    /// Creates a conversion that invokes `method` after packing with `pack`.
    /// Responses pass through unconverted until an unpack function is set.
    pub fn new<F>(method: impl Into<String>, pack: F) -> Self
    where
        F: Fn(&Value, &QueryOptions) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self {
            method: method.into(),
            pack: Arc::new(pack),
            unpack: None,
        }
    }

    /// Sets the response unpack function.
    pub fn with_unpack<F>(mut self, unpack: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.unpack = Some(Arc::new(unpack));
        self
    }

    /// The remote method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Packs a request into its wire payload.
    pub fn pack(&self, request: &Value, options: &QueryOptions) -> Result<Value, ConversionError> {
        (self.pack)(request, options)
    }

    /// Returns `true` if responses are unpacked rather than passed through.
    pub fn has_unpack(&self) -> bool {
        self.unpack.is_some()
    }

    /// Unpacks a response, or returns it unchanged when no unpack function
    /// is registered.
    pub fn unpack(&self, response: Value) -> Result<Value, ConversionError> {
        match &self.unpack {
            Some(unpack) => unpack(response),
            None => Ok(response),
        }
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion")
            .field("method", &self.method)
            .field("has_unpack", &self.unpack.is_some())
            .finish()
    }
}

/// Mapping from task kind to [`Conversion`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shard_query::{Conversion, MethodTable, TaskKind};
///
/// let table = MethodTable::new().with_conversion(
///     TaskKind::TextGeneration,
///     Conversion::new("GeneratorReply", |request, _options| Ok(request.clone())),
/// );
///
/// assert!(table.contains(&TaskKind::TextGeneration));
/// assert!(table.get(&TaskKind::from("unsupported")).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    conversions: HashMap<TaskKind, Conversion>,
}

impl MethodTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table covering every well-known task kind.
    ///
    /// Requests must be JSON objects; they are sent as
    /// `{"request": <request>, "query_kwargs": <options>}`. Responses must
    /// be JSON objects, except for `text-to-image`, whose responses pass
    /// through unconverted.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for kind in TaskKind::KNOWN {
            let conversion = Conversion::new(standard_method(&kind), envelope_pack);
            let conversion = if kind == TaskKind::TextToImage {
                conversion
            } else {
                conversion.with_unpack(object_unpack)
            };
            table.register(kind, conversion);
        }
        table
    }

    /// Registers (or replaces) the conversion for `kind`.
    pub fn register(&mut self, kind: TaskKind, conversion: Conversion) -> Option<Conversion> {
        self.conversions.insert(kind, conversion)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_conversion(mut self, kind: TaskKind, conversion: Conversion) -> Self {
        self.register(kind, conversion);
        self
    }

    /// Looks up the conversion for `kind`.
    pub fn get(&self, kind: &TaskKind) -> Option<&Conversion> {
        self.conversions.get(kind)
    }

    /// Returns `true` if `kind` has a registered conversion.
    pub fn contains(&self, kind: &TaskKind) -> bool {
        self.conversions.contains_key(kind)
    }

    /// Number of registered task kinds.
    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}

fn standard_method(kind: &TaskKind) -> &'static str {
    match kind {
        TaskKind::TextGeneration => "GeneratorReply",
        TaskKind::TextClassification => "ClassificationReply",
        TaskKind::QuestionAnswering => "QuestionAndAnswerReply",
        TaskKind::FillMask => "FillMaskReply",
        TaskKind::TokenClassification => "TokenClassificationReply",
        TaskKind::Conversational => "ConversationalReply",
        TaskKind::TextToImage => "Txt2ImgReply",
        TaskKind::Custom(_) => "Reply",
    }
}

fn envelope_pack(request: &Value, options: &QueryOptions) -> Result<Value, ConversionError> {
    if !request.is_object() {
        return Err(ConversionError::new("request must be a JSON object"));
    }
    Ok(json!({
        "request": request,
        "query_kwargs": options,
    }))
}

fn object_unpack(response: Value) -> Result<Value, ConversionError> {
    if response.is_object() {
        Ok(response)
    } else {
        Err(ConversionError::new(format!(
            "expected a JSON object response, got {response}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn standard_table_covers_known_kinds() {
        let table = MethodTable::standard();
        assert_eq!(table.len(), TaskKind::KNOWN.len());
        assert_eq!(
            table.get(&TaskKind::QuestionAnswering).map(Conversion::method),
            Some("QuestionAndAnswerReply")
        );
        assert!(!table.contains(&TaskKind::Custom("unsupported".into())));
    }

    #[test]
    fn standard_pack_wraps_request_and_options() {
        let table = MethodTable::standard();
        let conversion = table.get(&TaskKind::TextGeneration).unwrap();
        let mut options = Map::new();
        options.insert("max_new_tokens".into(), json!(16));

        let payload = conversion
            .pack(&json!({"query": ["hi"]}), &options)
            .unwrap();
        assert_eq!(
            payload,
            json!({"request": {"query": ["hi"]}, "query_kwargs": {"max_new_tokens": 16}})
        );

        let err = conversion.pack(&json!("hi"), &options).unwrap_err();
        assert!(err.message.contains("JSON object"));
    }

    #[test]
    fn unpack_is_optional() {
        let table = MethodTable::standard();
        let image = table.get(&TaskKind::TextToImage).unwrap();
        assert!(!image.has_unpack());
        assert_eq!(image.unpack(json!([1, 2])).unwrap(), json!([1, 2]));

        let text = table.get(&TaskKind::TextGeneration).unwrap();
        assert!(text.unpack(json!([1, 2])).is_err());
    }

    #[test]
    fn register_replaces_existing_conversion() {
        let mut table = MethodTable::standard();
        let previous = table.register(
            TaskKind::FillMask,
            Conversion::new("CustomFill", |r, _| Ok(r.clone())),
        );
        assert_eq!(previous.map(|c| c.method().to_string()).as_deref(), Some("FillMaskReply"));
        assert_eq!(table.get(&TaskKind::FillMask).unwrap().method(), "CustomFill");
    }
}
