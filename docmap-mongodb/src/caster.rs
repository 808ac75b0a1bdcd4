//! Value casting between raw BSON values and declared property types.
//!
//! Casting never fails hard. When a value cannot be converted, the original
//! value is kept and a [`CastDiagnostic`] is attached to the result so the
//! caller can decide whether to log it, collect it or escalate it.

use std::fmt;

use bson::{Bson, Document, oid::ObjectId};
use docmap_schema::{EntityMeta, FieldType};
use smol_str::SmolStr;
use tracing::warn;

use crate::document::{ID_FIELD, bson_type_name, bson_types, is_object_id_hex};
use crate::error::{MongoError, MongoResult};

/// Why a value was left uncast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The identifier type was requested for a value that is not a string.
    NotAString,
    /// The string is not 24 hexadecimal characters.
    MalformedObjectId,
    /// The generic caster has no conversion for this value.
    Unconvertible,
}

/// A recoverable cast failure.
#[derive(Debug, Clone, PartialEq)]
pub struct CastDiagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Property the value belongs to, when known.
    pub property: Option<SmolStr>,
    /// The offending value, unchanged.
    pub value: Bson,
    /// Name of the type the value was cast to.
    pub target: String,
}

impl CastDiagnostic {
    fn new(kind: DiagnosticKind, value: &Bson, target: &FieldType) -> Self {
        Self {
            kind,
            property: None,
            value: value.clone(),
            target: target.name(),
        }
    }

    /// Attach the property name, unless one is already set by a nested cast.
    pub fn at(mut self, property: &str) -> Self {
        if self.property.is_none() {
            self.property = Some(SmolStr::new(property));
        }
        self
    }
}

impl fmt::Display for CastDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.value) {
            (DiagnosticKind::MalformedObjectId, Bson::String(s)) => {
                write!(f, "unable to cast string '{}' to a {}", s, self.target)?
            }
            _ => write!(
                f,
                "unable to cast {} to a {}",
                bson_type_name(&self.value),
                self.target
            )?,
        }
        if let Some(property) = &self.property {
            write!(f, " (property `{}`)", property)?;
        }
        Ok(())
    }
}

/// A value together with the diagnostics raised while producing it.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Casted<T> {
    /// The produced value. Uncastable parts keep their original value.
    pub value: T,
    /// Everything that could not be cast.
    pub diagnostics: Vec<CastDiagnostic>,
}

impl<T> Casted<T> {
    /// A cleanly cast value.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// A value that was left uncast for the given reason.
    pub fn skipped(value: T, diagnostic: CastDiagnostic) -> Self {
        Self {
            value,
            diagnostics: vec![diagnostic],
        }
    }

    /// Check if no diagnostics were raised.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drop the diagnostics and return the value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Transform the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Casted<U> {
        Casted {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Move the diagnostics of another result into this one and return its value.
    pub fn absorb<U>(&mut self, other: Casted<U>) -> U {
        self.diagnostics.extend(other.diagnostics);
        other.value
    }

    /// Log every diagnostic at `warn` level and return the value.
    pub fn logged(self) -> T {
        for diagnostic in &self.diagnostics {
            warn!(
                property = diagnostic.property.as_deref().unwrap_or(""),
                target = %diagnostic.target,
                actual = bson_type_name(&diagnostic.value),
                "{}",
                diagnostic
            );
        }
        self.value
    }

    /// Fail on the first diagnostic.
    pub fn strict(mut self) -> MongoResult<T> {
        if self.diagnostics.is_empty() {
            Ok(self.value)
        } else {
            Err(MongoError::Cast(self.diagnostics.remove(0)))
        }
    }
}

/// Casts single values to declared [`FieldType`]s.
///
/// The identifier type gets a guard in front of the generic conversion:
/// only existing ObjectIds, 24-hex-digit strings and embedded documents
/// carrying an `_id` are converted. Everything else is returned unchanged
/// with a diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCaster;

impl ValueCaster {
    /// Create a new caster.
    pub fn new() -> Self {
        Self
    }

    /// Cast a value to the target type.
    ///
    /// `null` is never cast.
    pub fn cast(&self, value: Bson, target: &FieldType) -> Casted<Bson> {
        if matches!(value, Bson::Null) {
            return Casted::ok(value);
        }

        if target.is_object_id() {
            return self.cast_to_object_id(value, target);
        }

        self.cast_generic(value, target)
    }

    fn cast_to_object_id(&self, value: Bson, target: &FieldType) -> Casted<Bson> {
        // An identifiable entity casts to its identifier. When that fails the
        // document is kept and the diagnostic of its `_id` is reported.
        if let Some(id) = value.as_document().and_then(|doc| doc.get(ID_FIELD)).cloned() {
            let casted = self.cast_to_object_id(id, target);
            if casted.is_clean() {
                return casted;
            }
            return Casted {
                value,
                diagnostics: casted.diagnostics,
            };
        }

        let failure = match &value {
            Bson::ObjectId(_) => None,
            Bson::String(s) if is_object_id_hex(s) => None,
            Bson::String(_) => Some(DiagnosticKind::MalformedObjectId),
            _ => Some(DiagnosticKind::NotAString),
        };

        match failure {
            None => self.cast_generic(value, target),
            Some(kind) => {
                let diagnostic = CastDiagnostic::new(kind, &value, target);
                Casted::skipped(value, diagnostic)
            }
        }
    }

    /// Generic conversion from primitive values to the target type.
    ///
    /// A value that already has the target type is returned as is.
    ///
    /// Date-times accept RFC 3339 strings and integer timestamps. An `Int64`
    /// is read as milliseconds since the epoch, like a BSON date-time. An
    /// `Int32` is read as seconds since the epoch.
    pub fn cast_generic(&self, value: Bson, target: &FieldType) -> Casted<Bson> {
        if matches!(value, Bson::Null) {
            return Casted::ok(value);
        }

        let converted = match target {
            FieldType::ObjectId => to_object_id(&value),
            FieldType::String => to_string(&value),
            FieldType::Int32 => to_i64(&value)
                .and_then(|i| i32::try_from(i).ok())
                .map(Bson::Int32),
            FieldType::Int64 => to_i64(&value).map(Bson::Int64),
            FieldType::Double => to_f64(&value).map(Bson::Double),
            FieldType::Bool => to_bool(&value).map(Bson::Boolean),
            FieldType::DateTime => to_datetime(&value).map(Bson::DateTime),
            FieldType::Uuid => to_uuid(&value),
            FieldType::Document => match value {
                Bson::Document(_) => return Casted::ok(value),
                _ => None,
            },
            FieldType::Array => match value {
                Bson::Array(_) => return Casted::ok(value),
                other => return Casted::ok(Bson::Array(vec![other])),
            },
            FieldType::List(inner) => return self.cast_list(value, inner),
            FieldType::Embedded(meta) => return self.cast_embedded(value, meta, target),
        };

        match converted {
            Some(v) => Casted::ok(v),
            None => {
                let diagnostic = CastDiagnostic::new(DiagnosticKind::Unconvertible, &value, target);
                Casted::skipped(value, diagnostic)
            }
        }
    }

    fn cast_list(&self, value: Bson, inner: &FieldType) -> Casted<Bson> {
        let items = match value {
            Bson::Array(items) => items,
            other => vec![other],
        };

        let mut result = Casted::ok(());
        let items = items
            .into_iter()
            .map(|item| result.absorb(self.cast(item, inner)))
            .collect();
        result.map(|_| Bson::Array(items))
    }

    fn cast_embedded(&self, value: Bson, meta: &EntityMeta, target: &FieldType) -> Casted<Bson> {
        match value {
            Bson::Document(doc) => self.cast_properties(doc, meta).map(Bson::Document),
            other => {
                let diagnostic = CastDiagnostic::new(DiagnosticKind::Unconvertible, &other, target);
                Casted::skipped(other, diagnostic)
            }
        }
    }

    /// Cast every declared property of a document to its value type.
    ///
    /// Keys the entity does not declare are kept as they are.
    pub fn cast_properties(&self, doc: Document, meta: &EntityMeta) -> Casted<Document> {
        let mut result = Casted::ok(());
        let mut out = Document::new();

        for (key, value) in doc {
            let value = match meta.get_property(&key).and_then(|p| p.value_type()) {
                Some(ty) => {
                    let casted = self.cast(value, ty);
                    let casted = Casted {
                        value: casted.value,
                        diagnostics: casted.diagnostics.into_iter().map(|d| d.at(&key)).collect(),
                    };
                    result.absorb(casted)
                }
                None => value,
            };
            out.insert(key, value);
        }

        result.map(|_| out)
    }
}

fn to_object_id(value: &Bson) -> Option<Bson> {
    match value {
        Bson::ObjectId(_) => Some(value.clone()),
        Bson::String(s) => ObjectId::parse_str(s).ok().map(Bson::ObjectId),
        _ => None,
    }
}

fn to_string(value: &Bson) -> Option<Bson> {
    let s = match value {
        Bson::String(_) => return Some(value.clone()),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::Symbol(s) => s.clone(),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().ok()?,
        Bson::Binary(_) => bson_types::bson_to_uuid(value).ok()?.to_string(),
        _ => return None,
    };
    Some(Bson::String(s))
}

fn to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => Some(*f as i64),
        Bson::Boolean(b) => Some(i64::from(*b)),
        Bson::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(f) => Some(*f),
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Bson::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(i) => Some(*i != 0),
        Bson::Int64(i) => Some(*i != 0),
        Bson::Double(f) => Some(*f != 0.0),
        Bson::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_datetime(value: &Bson) -> Option<bson::DateTime> {
    match value {
        Bson::DateTime(dt) => Some(*dt),
        Bson::Int64(millis) => Some(bson::DateTime::from_millis(*millis)),
        // Unix timestamp in seconds
        Bson::Int32(secs) => Some(bson::DateTime::from_millis(i64::from(*secs) * 1000)),
        Bson::String(s) => bson_types::parse_datetime(s).ok(),
        _ => None,
    }
}

fn to_uuid(value: &Bson) -> Option<Bson> {
    match value {
        Bson::Binary(b) if b.subtype == bson::spec::BinarySubtype::Uuid => Some(value.clone()),
        Bson::Binary(_) | Bson::String(_) => bson_types::bson_to_uuid(value)
            .ok()
            .map(bson_types::uuid_to_bson),
        _ => None,
    }
}
