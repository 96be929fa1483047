//! serde bridge: lowers any `Serialize` type into a [`Value`].

use serde::ser::{self, Serialize};

use crate::error::ValueError;
use crate::value::{
    canonical_cmp, is_hash_set, short_type_name, Record, Value, RECORD_TOKEN, TEXTUAL_TOKEN,
};

/// Convert any serializable value into the comparison model.
///
/// Newtype structs are transparent, enum variants become records named
/// `Enum::Variant`, `None` and `()` become [`Value::Absent`] and `Some(x)`
/// becomes [`Value::Ref`]. `HashSet` elements are sorted canonically.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ValueError> {
    let mut lowered = value.serialize(ValueSerializer)?;
    if let Value::Seq(items) = &mut lowered
        && is_hash_set(std::any::type_name::<T>())
    {
        items.sort_by(canonical_cmp);
    }
    Ok(lowered)
}

/// The `Serializer` behind [`to_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = ValueError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = RecordBuilder;
    type SerializeTupleVariant = RecordBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = RecordBuilder;
    type SerializeStructVariant = RecordBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value, ValueError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, ValueError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, ValueError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, ValueError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, ValueError> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, ValueError> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| ValueError::IntegerOutOfRange(v.to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, ValueError> {
        Ok(Value::Uint(u64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, ValueError> {
        Ok(Value::Uint(u64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, ValueError> {
        Ok(Value::Uint(u64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, ValueError> {
        Ok(Value::Uint(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, ValueError> {
        u64::try_from(v)
            .map(Value::Uint)
            .map_err(|_| ValueError::IntegerOutOfRange(v.to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, ValueError> {
        Ok(Value::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, ValueError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, ValueError> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, ValueError> {
        Ok(Value::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, ValueError> {
        Ok(Value::Seq(
            v.iter().map(|byte| Value::Uint(u64::from(*byte))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value, ValueError> {
        Ok(Value::Absent)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, ValueError> {
        Ok(Value::Ref(Box::new(to_value(value)?)))
    }

    fn serialize_unit(self) -> Result<Value, ValueError> {
        Ok(Value::Absent)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value, ValueError> {
        Ok(Value::Record(Record::new(name)))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, ValueError> {
        Ok(Value::Record(Record::new(format!("{name}::{variant}"))))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, ValueError> {
        to_value(value)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, ValueError> {
        Ok(Value::Record(
            Record::new(format!("{name}::{variant}")).with_field("0", to_value(value)?),
        ))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<RecordBuilder, ValueError> {
        Ok(RecordBuilder::new(name.to_string(), len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<RecordBuilder, ValueError> {
        Ok(RecordBuilder::new(format!("{name}::{variant}"), len))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder, ValueError> {
        Ok(MapBuilder {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<RecordBuilder, ValueError> {
        Ok(RecordBuilder::new(name.to_string(), len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<RecordBuilder, ValueError> {
        Ok(RecordBuilder::new(format!("{name}::{variant}"), len))
    }
}

// ---------------------------------------------------------------------------
// Compound builders
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SeqBuilder {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValueError> {
        Ok(Value::Seq(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, ValueError> {
        ser::SerializeSeq::end(self)
    }
}

#[derive(Debug)]
pub struct MapBuilder {
    entries: Vec<(Value, Value)>,
    pending_key: Option<Value>,
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ValueError> {
        self.pending_key = Some(to_value(key)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        let key = self
            .pending_key
            .take()
            .ok_or(ValueError::DanglingMapValue)?;
        self.entries.push((key, to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<Value, ValueError> {
        Ok(Value::Map(self.entries))
    }
}

/// Builds records for structs, tuple structs and struct/tuple variants.
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    fields: Vec<(String, Value)>,
}

impl RecordBuilder {
    fn new(name: String, len: usize) -> Self {
        Self {
            name,
            fields: Vec::with_capacity(len),
        }
    }

    fn push_positional<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        let index = self.fields.len().to_string();
        self.fields.push((index, to_value(value)?));
        Ok(())
    }

    fn push_named<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.fields.push((key.to_string(), to_value(value)?));
        Ok(())
    }

    fn finish(self) -> Result<Value, ValueError> {
        match self.name.as_str() {
            RECORD_TOKEN => rebuild_record(self.fields),
            TEXTUAL_TOKEN => rebuild_textual(self.fields),
            _ => Ok(Value::Record(Record {
                name: self.name,
                fields: self.fields,
                text: None,
            })),
        }
    }
}

fn take_field(fields: &mut Vec<(String, Value)>, name: &str) -> Value {
    fields
        .iter()
        .position(|(field, _)| field == name)
        .map_or(Value::Absent, |at| fields.swap_remove(at).1)
}

fn take_text(fields: &mut Vec<(String, Value)>, name: &str) -> Result<Option<String>, ValueError> {
    match take_field(fields, name) {
        Value::Absent => Ok(None),
        Value::Str(text) => Ok(Some(text)),
        Value::Ref(inner) => match *inner {
            Value::Str(text) => Ok(Some(text)),
            other => Err(ValueError::Custom(format!(
                "record field {name} must be text, got {}",
                other.type_name()
            ))),
        },
        other => Err(ValueError::Custom(format!(
            "record field {name} must be text, got {}",
            other.type_name()
        ))),
    }
}

fn rebuild_record(mut fields: Vec<(String, Value)>) -> Result<Value, ValueError> {
    let name = take_text(&mut fields, "name")?.unwrap_or_default();
    let text = take_text(&mut fields, "text")?;
    let members = match take_field(&mut fields, "fields") {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, value)| match key {
                Value::Str(field) => Ok((field, value)),
                other => Err(ValueError::Custom(format!(
                    "record field names must be text, got {}",
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };
    Ok(Value::Record(Record {
        name,
        fields: members,
        text,
    }))
}

fn rebuild_textual(mut fields: Vec<(String, Value)>) -> Result<Value, ValueError> {
    let type_name = take_text(&mut fields, "type")?.unwrap_or_default();
    let text = take_text(&mut fields, "text")?.unwrap_or_default();
    let record = match take_field(&mut fields, "value") {
        Value::Record(record) => record.with_text(text),
        other => Record::new(short_type_name(&type_name))
            .with_field("0", other)
            .with_text(text),
    };
    Ok(Value::Record(record))
}

impl ser::SerializeTupleStruct for RecordBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push_positional(value)
    }

    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for RecordBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push_positional(value)
    }

    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeStruct for RecordBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.push_named(key, value)
    }

    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for RecordBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.push_named(key, value)
    }

    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}
