//! Type descriptors.
//!
//! Binding and schema synthesis both need to know the *shape* of a type: is
//! it a scalar, a struct with named fields, a wrapper around something else?
//! Rust has no runtime reflection, so every type that takes part in binding
//! describes itself once through [`Describe`]. Descriptors are plain data and
//! are computed at registration time, never while serving requests.
//!
//! Struct fields hold a function pointer rather than an already expanded
//! descriptor so that self-referential types describe in finite time.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::mime::NamingConvention;

/// A type that can describe its own shape.
pub trait Describe {
    /// Describe the type.
    fn describe() -> TypeDescriptor;
}

/// Primitive value kinds a raw string can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Char,
    String,
}

impl ScalarKind {
    /// Rust name of the type this kind stands for.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "String",
        }
    }

    /// True for the unsigned integer kinds.
    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::Usize
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One level of indirection or collection around an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapper {
    /// `Option<T>`: may be absent, never required.
    Optional,
    /// `Box<T>`, `Arc<T>`, `Rc<T>`.
    Pointer,
    /// `Vec<T>`, `VecDeque<T>`.
    Slice,
    /// `[T; N]`.
    Array,
    /// Maps; the element is the value type.
    Map,
    /// Channel endpoints.
    Channel,
    /// Functions; the element is the return type.
    Function,
    /// `*const T`, `*mut T`.
    RawPointer,
}

impl Wrapper {
    /// True for the wrappers that behave like a pointer to the element.
    #[must_use]
    pub fn is_pointer(self) -> bool {
        matches!(self, Self::Optional | Self::Pointer)
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optional => "optional",
            Self::Pointer => "pointer to",
            Self::Slice => "slice of",
            Self::Array => "array of",
            Self::Map => "map of",
            Self::Channel => "channel of",
            Self::Function => "function returning",
            Self::RawPointer => "raw pointer to",
        })
    }
}

/// Shape of a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A primitive.
    Scalar(ScalarKind),
    /// A struct with named fields.
    Struct(StructDescriptor),
    /// A fieldless enum, carried as its variant name.
    Enum(EnumDescriptor),
    /// An uploaded file.
    File,
    /// A wrapper around an element type.
    Wrapped(Wrapper, Box<TypeDescriptor>),
    /// A dynamically typed value such as `serde_json::Value`.
    Interface,
    /// `()`: no value at all.
    Unit,
}

impl TypeDescriptor {
    /// Shorthand for [`TypeDescriptor::Wrapped`].
    #[must_use]
    pub fn wrap(wrapper: Wrapper, inner: TypeDescriptor) -> Self {
        Self::Wrapped(wrapper, Box::new(inner))
    }

    /// The type's own name, or `""` for anonymous shapes (wrappers and
    /// dynamic values).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar(kind) => kind.name(),
            Self::Struct(s) => s.name,
            Self::Enum(e) => e.name,
            Self::File => "UploadFile",
            Self::Unit => "()",
            Self::Wrapped(..) | Self::Interface => "",
        }
    }

    /// Human readable kind, used in configuration errors.
    #[must_use]
    pub fn kind_label(&self) -> String {
        match self {
            Self::Scalar(kind) => kind.name().to_string(),
            Self::Struct(_) => "struct".to_string(),
            Self::Enum(_) => "enum".to_string(),
            Self::File => "file".to_string(),
            Self::Wrapped(wrapper, inner) => format!("{wrapper} {}", inner.kind_label()),
            Self::Interface => "interface".to_string(),
            Self::Unit => "unit".to_string(),
        }
    }

    /// True for `Option<T>`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Wrapped(Wrapper::Optional, _))
    }

    /// Strip one `Option` layer, if present.
    #[must_use]
    pub fn unwrap_optional(&self) -> &TypeDescriptor {
        match self {
            Self::Wrapped(Wrapper::Optional, inner) => inner,
            other => other,
        }
    }

    /// Struct details, if this is a struct.
    #[must_use]
    pub fn as_struct(&self) -> Option<&StructDescriptor> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// True if any direct field of this struct holds an uploaded file.
    #[must_use]
    pub fn has_file_field(&self) -> bool {
        let Some(s) = self.as_struct() else {
            return false;
        };
        s.fields.iter().any(|field| {
            match field.descriptor().unwrap_optional() {
                Self::File => true,
                Self::Wrapped(Wrapper::Slice, inner) => matches!(**inner, Self::File),
                _ => false,
            }
        })
    }
}

/// A struct and its named fields, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    /// Struct name.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    /// Find a field by its name under a convention.
    #[must_use]
    pub fn field(&self, name: &str, convention: NamingConvention) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name_for(convention) == name)
    }
}

/// A fieldless enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Enum name.
    pub name: &'static str,
    /// Serialized variant names.
    pub variants: Vec<&'static str>,
}

/// One named struct field.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    /// Rust identifier.
    pub ident: &'static str,
    /// Name in JSON (the serde name).
    pub json_name: &'static str,
    /// Element name in XML.
    pub xml_name: &'static str,
    /// Field name in url-encoded and multipart forms.
    pub form_name: &'static str,
    /// Describes the field's type on demand.
    pub describe: fn() -> TypeDescriptor,
}

impl FieldDescriptor {
    /// A field whose every name equals its identifier.
    #[must_use]
    pub fn new(ident: &'static str, describe: fn() -> TypeDescriptor) -> Self {
        Self {
            ident,
            json_name: ident,
            xml_name: ident,
            form_name: ident,
            describe,
        }
    }

    /// The field's name under a naming convention.
    #[must_use]
    pub fn name_for(&self, convention: NamingConvention) -> &'static str {
        match convention {
            NamingConvention::Json => self.json_name,
            NamingConvention::Xml => self.xml_name,
            NamingConvention::Form => self.form_name,
        }
    }

    /// Describe the field's type.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("ident", &self.ident)
            .field("json_name", &self.json_name)
            .field("xml_name", &self.xml_name)
            .field("form_name", &self.form_name)
            .finish_non_exhaustive()
    }
}

// Field types are compared by name only; expanding them could recurse forever.
impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident
            && self.json_name == other.json_name
            && self.xml_name == other.xml_name
            && self.form_name == other.form_name
    }
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::Scalar(ScalarKind::$kind)
                }
            }
        )*
    };
}

describe_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

impl Describe for () {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Unit
    }
}

impl Describe for serde_json::Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Interface
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Optional, T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Pointer, T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Pointer, T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for Rc<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Pointer, T::describe())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Slice, T::describe())
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Slice, T::describe())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Array, T::describe())
    }
}

impl<K, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Map, V::describe())
    }
}

impl<K, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Map, V::describe())
    }
}

/// Name of a generic type instantiated with `args`, such as `Page_User`.
///
/// Each distinct name is leaked once and reused afterwards, so two
/// instantiations of the same generic never share a component name.
#[must_use]
pub fn generic_name(base: &'static str, args: &[TypeDescriptor]) -> &'static str {
    static NAMES: Mutex<BTreeSet<&'static str>> = parking_lot::const_mutex(BTreeSet::new());

    if args.is_empty() {
        return base;
    }
    let mut name = base.to_string();
    for arg in args {
        name.push('_');
        push_argument_label(&mut name, arg);
    }

    let mut names = NAMES.lock();
    if let Some(interned) = names.get(name.as_str()) {
        return *interned;
    }
    let interned: &'static str = Box::leak(name.into_boxed_str());
    names.insert(interned);
    interned
}

fn push_argument_label(out: &mut String, desc: &TypeDescriptor) {
    match desc {
        TypeDescriptor::Wrapped(Wrapper::Pointer | Wrapper::RawPointer, inner) => {
            push_argument_label(out, inner);
        }
        TypeDescriptor::Wrapped(wrapper, inner) => {
            out.push_str(match wrapper {
                Wrapper::Optional => "Option_",
                Wrapper::Slice | Wrapper::Array => "Vec_",
                Wrapper::Map => "Map_",
                Wrapper::Channel => "Channel_",
                Wrapper::Function => "Fn_",
                Wrapper::Pointer | Wrapper::RawPointer => "",
            });
            push_argument_label(out, inner);
        }
        TypeDescriptor::Interface => out.push_str("Value"),
        TypeDescriptor::Unit => out.push_str("Unit"),
        other => out.push_str(other.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> TypeDescriptor {
        TypeDescriptor::Struct(StructDescriptor {
            name: "Metadata",
            fields: vec![FieldDescriptor::new("first_name", String::describe)],
        })
    }

    fn upload() -> TypeDescriptor {
        TypeDescriptor::File
    }

    fn optional_upload() -> TypeDescriptor {
        TypeDescriptor::wrap(Wrapper::Optional, TypeDescriptor::File)
    }

    #[test]
    fn test_wrappers_describe_their_element() {
        assert_eq!(
            Option::<u64>::describe(),
            TypeDescriptor::wrap(Wrapper::Optional, TypeDescriptor::Scalar(ScalarKind::U64))
        );
        assert_eq!(
            Vec::<Box<String>>::describe(),
            TypeDescriptor::wrap(
                Wrapper::Slice,
                TypeDescriptor::wrap(Wrapper::Pointer, TypeDescriptor::Scalar(ScalarKind::String))
            )
        );
        assert_eq!(
            <[i32; 3]>::describe(),
            TypeDescriptor::wrap(Wrapper::Array, TypeDescriptor::Scalar(ScalarKind::I32))
        );
        assert_eq!(
            HashMap::<String, f64>::describe(),
            TypeDescriptor::wrap(Wrapper::Map, TypeDescriptor::Scalar(ScalarKind::F64))
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(u64::describe().name(), "u64");
        assert_eq!(String::describe().name(), "String");
        assert_eq!(metadata().name(), "Metadata");
        assert_eq!(Vec::<u8>::describe().name(), "");
        assert_eq!(serde_json::Value::describe().name(), "");
    }

    #[test]
    fn test_kind_label() {
        let desc = TypeDescriptor::wrap(Wrapper::Pointer, metadata());
        assert_eq!(desc.kind_label(), "pointer to struct");
        let desc = TypeDescriptor::wrap(Wrapper::Channel, u8::describe());
        assert_eq!(desc.kind_label(), "channel of u8");
        assert_eq!(Option::<Vec<u8>>::describe().kind_label(), "optional slice of u8");
    }

    #[test]
    fn test_unwrap_optional_strips_one_layer() {
        let desc = Option::<Option<u8>>::describe();
        assert!(desc.is_optional());
        assert!(desc.unwrap_optional().is_optional());
        assert_eq!(u8::describe().unwrap_optional(), &u8::describe());
    }

    #[test]
    fn test_has_file_field() {
        let with_file = TypeDescriptor::Struct(StructDescriptor {
            name: "Upload",
            fields: vec![
                FieldDescriptor::new("name", String::describe),
                FieldDescriptor::new("file", upload),
            ],
        });
        let with_optional_file = TypeDescriptor::Struct(StructDescriptor {
            name: "Upload",
            fields: vec![FieldDescriptor::new("file", optional_upload)],
        });
        assert!(with_file.has_file_field());
        assert!(with_optional_file.has_file_field());
        assert!(!metadata().has_file_field());
        assert!(!u8::describe().has_file_field());
    }

    #[test]
    fn test_field_lookup_by_convention() {
        let field = FieldDescriptor {
            ident: "first_name",
            json_name: "first_name",
            xml_name: "FirstName",
            form_name: "first-name",
            describe: String::describe,
        };
        let desc = StructDescriptor {
            name: "Person",
            fields: vec![field],
        };
        assert!(desc.field("FirstName", NamingConvention::Xml).is_some());
        assert!(desc.field("first-name", NamingConvention::Form).is_some());
        assert!(desc.field("FirstName", NamingConvention::Json).is_none());
    }

    #[test]
    fn test_generic_name_includes_arguments() {
        let page_meta = generic_name("Page", &[metadata()]);
        assert_eq!(page_meta, "Page_Metadata");
        assert_eq!(generic_name("Page", &[u64::describe()]), "Page_u64");
        assert_eq!(
            generic_name("Pair", &[Vec::<Box<String>>::describe(), Option::<u8>::describe()]),
            "Pair_Vec_String_Option_u8"
        );
        assert_eq!(generic_name("Plain", &[]), "Plain");
    }

    #[test]
    fn test_generic_name_is_interned() {
        let first = generic_name("Envelope", &[metadata()]);
        let second = generic_name("Envelope", &[metadata()]);
        assert!(std::ptr::eq(first, second));
        assert_ne!(first, generic_name("Envelope", &[String::describe()]));
    }
}
