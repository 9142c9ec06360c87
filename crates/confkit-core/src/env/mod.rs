//! Environment variable overlay.
//!
//! A record opts in by implementing [`EnvOverlay`], usually through
//! `#[derive(EnvOverlay)]`. The implementation returns a descriptor table with
//! one [`FieldBinding`] per field, in declaration order: the field name, the
//! environment variable bound to it (if any), and a [`FieldSlot`] giving typed
//! write access to the field.
//!
//! [`apply_overrides`] walks that table depth-first:
//!
//! - nested records are visited in place;
//! - absent optional nested records are first created with `Default`;
//! - a scalar bound to a variable that is set is parsed and overwritten;
//! - everything else keeps its value.
//!
//! # Manual implementation
//!
//! ```rust
//! use confkit_core::env::{EnvOverlay, EnvSlot, FieldBinding, apply_overrides_from};
//! use std::collections::HashMap;
//!
//! #[derive(Default)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl EnvOverlay for Server {
//!     fn env_fields(&mut self) -> Vec<FieldBinding<'_>> {
//!         vec![
//!             FieldBinding::tagged("host", "SERVER_HOST", self.host.env_slot()),
//!             FieldBinding::tagged("port", "SERVER_PORT", self.port.env_slot()),
//!         ]
//!     }
//! }
//!
//! let vars = HashMap::from([("SERVER_PORT".to_string(), "8080".to_string())]);
//! let mut server = Server { host: "localhost".into(), port: 3000 };
//! apply_overrides_from(&mut server, &vars).unwrap();
//! assert_eq!(server.port, 8080);
//! assert_eq!(server.host, "localhost");
//! ```

mod overlay;
mod source;
mod value;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

pub use overlay::{EnvError, EnvResult, apply_overrides, apply_overrides_from};
pub use source::{EnvSource, ProcessEnv};
pub use value::{ConvertError, EnvValue, ValueKind, parse_bool};

/// A record whose fields can be overridden from environment variables.
pub trait EnvOverlay {
    /// Describes every field of this level, in declaration order.
    fn env_fields(&mut self) -> Vec<FieldBinding<'_>>;
}

impl<T: EnvOverlay + ?Sized> EnvOverlay for Box<T> {
    fn env_fields(&mut self) -> Vec<FieldBinding<'_>> {
        (**self).env_fields()
    }
}

/// One row of a record's descriptor table.
pub struct FieldBinding<'a> {
    /// Field name, used in error messages.
    pub name: &'static str,
    /// Environment variable bound to the field.
    pub env: Option<&'static str>,
    /// Typed access to the field.
    pub slot: FieldSlot<'a>,
}

impl<'a> FieldBinding<'a> {
    pub fn new(name: &'static str, env: Option<&'static str>, slot: FieldSlot<'a>) -> Self {
        Self { name, env, slot }
    }

    /// A field bound to the variable `env`.
    pub fn tagged(name: &'static str, env: &'static str, slot: FieldSlot<'a>) -> Self {
        Self::new(name, Some(env), slot)
    }

    /// A field without a variable; only visited when it is a nested record.
    pub fn untagged(name: &'static str, slot: FieldSlot<'a>) -> Self {
        Self::new(name, None, slot)
    }
}

impl std::fmt::Debug for FieldBinding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("env", &self.env)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Typed write access to a single field.
pub enum FieldSlot<'a> {
    /// A scalar that can be parsed from text.
    Value(&'a mut dyn EnvValue),
    /// A nested record, visited in place.
    Nested(&'a mut dyn EnvOverlay),
    /// An optional nested record, created with `Default` when absent.
    OptionalNested(&'a mut dyn OptionalRecord),
    /// A type the overlay cannot assign, with its type name.
    Unsupported(&'static str),
}

impl std::fmt::Debug for FieldSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "Value({})", value.kind()),
            Self::Nested(_) => f.write_str("Nested"),
            Self::OptionalNested(_) => f.write_str("OptionalNested"),
            Self::Unsupported(ty) => write!(f, "Unsupported({ty})"),
        }
    }
}

/// An optional nested record.
pub trait OptionalRecord {
    /// Returns the record, inserting a default one first if absent.
    fn get_or_default(&mut self) -> &mut dyn EnvOverlay;
}

impl<T: EnvOverlay + Default> OptionalRecord for Option<T> {
    fn get_or_default(&mut self) -> &mut dyn EnvOverlay {
        self.get_or_insert_with(T::default)
    }
}

/// Maps a field type to its [`FieldSlot`].
///
/// Implemented for the supported scalars, for every [`EnvOverlay`] record,
/// for `Option` of a record, and for common container types (which map to
/// [`FieldSlot::Unsupported`]). When deriving, an untagged field of any other
/// type is recorded as unsupported; a tagged one must implement this trait.
pub trait EnvSlot {
    fn env_slot(&mut self) -> FieldSlot<'_>;
}

impl<T: EnvOverlay> EnvSlot for T {
    fn env_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Nested(self)
    }
}

impl<T: EnvOverlay + Default> EnvSlot for Option<T> {
    fn env_slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::OptionalNested(self)
    }
}

macro_rules! value_slot {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl EnvSlot for $ty {
                fn env_slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::Value(self)
                }
            }
        )+
    };
}

value_slot!(
    String, bool, f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
);

macro_rules! unsupported_slot {
    ($([$($generics:tt)*] $ty:ty),+ $(,)?) => {
        $(
            impl<$($generics)*> EnvSlot for $ty {
                fn env_slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::Unsupported(std::any::type_name::<Self>())
                }
            }
        )+
    };
}

unsupported_slot!(
    [] char,
    [] PathBuf,
    [T] Vec<T>,
    [T] VecDeque<T>,
    [T, S] HashSet<T, S>,
    [T] BTreeSet<T>,
    [K, V, S] HashMap<K, V, S>,
    [K, V] BTreeMap<K, V>,
);

/// Slot selection for derived untagged fields.
///
/// `(&SlotSelect::<T>::new()).slot_fn()` resolves to [`EnvSlot::env_slot`] when
/// `T: EnvSlot` and to [`FieldSlot::Unsupported`] otherwise: method lookup
/// tries the by-reference receiver before the auto-referenced one.
#[doc(hidden)]
pub mod __private {
    use std::marker::PhantomData;

    use super::{EnvSlot, FieldSlot};

    pub type SlotFn<T> = for<'a> fn(&'a mut T) -> FieldSlot<'a>;

    pub struct SlotSelect<T>(PhantomData<fn(T)>);

    impl<T> SlotSelect<T> {
        #[allow(clippy::new_without_default)]
        pub fn new() -> Self {
            Self(PhantomData)
        }
    }

    pub trait SlotViaTrait<T> {
        fn slot_fn(&self) -> SlotFn<T>;
    }

    impl<T: EnvSlot> SlotViaTrait<T> for SlotSelect<T> {
        fn slot_fn(&self) -> SlotFn<T> {
            <T as EnvSlot>::env_slot
        }
    }

    pub trait SlotFallback<T> {
        fn slot_fn(&self) -> SlotFn<T>;
    }

    impl<T> SlotFallback<T> for &SlotSelect<T> {
        fn slot_fn(&self) -> SlotFn<T> {
            unsupported::<T>
        }
    }

    fn unsupported<T>(_: &mut T) -> FieldSlot<'_> {
        FieldSlot::Unsupported(std::any::type_name::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Leaf {
        value: i32,
    }

    impl EnvOverlay for Leaf {
        fn env_fields(&mut self) -> Vec<FieldBinding<'_>> {
            vec![FieldBinding::tagged("value", "LEAF_VALUE", self.value.env_slot())]
        }
    }

    #[test]
    fn test_slot_mapping() {
        let mut name = String::new();
        assert!(matches!(name.env_slot(), FieldSlot::Value(_)));

        let mut leaf = Leaf::default();
        assert!(matches!(leaf.env_slot(), FieldSlot::Nested(_)));

        let mut boxed = Box::new(Leaf::default());
        assert!(matches!(boxed.env_slot(), FieldSlot::Nested(_)));

        let mut optional: Option<Leaf> = None;
        assert!(matches!(optional.env_slot(), FieldSlot::OptionalNested(_)));

        let mut list: Vec<String> = Vec::new();
        match list.env_slot() {
            FieldSlot::Unsupported(ty) => assert!(ty.contains("Vec")),
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_select_falls_back_to_unsupported() {
        use __private::{SlotFallback as _, SlotSelect, SlotViaTrait as _};

        let mut port: u16 = 1;
        let slot = (&SlotSelect::<u16>::new()).slot_fn()(&mut port);
        assert!(matches!(slot, FieldSlot::Value(_)));

        let mut leaf: Option<Leaf> = None;
        let slot = (&SlotSelect::<Option<Leaf>>::new()).slot_fn()(&mut leaf);
        assert!(matches!(slot, FieldSlot::OptionalNested(_)));

        let mut nickname: Option<String> = None;
        match (&SlotSelect::<Option<String>>::new()).slot_fn()(&mut nickname) {
            FieldSlot::Unsupported(ty) => assert!(ty.contains("Option")),
            other => panic!("expected Unsupported, got {other:?}"),
        }

        let mut timeout = Duration::from_secs(1);
        let slot = (&SlotSelect::<Duration>::new()).slot_fn()(&mut timeout);
        assert!(matches!(slot, FieldSlot::Unsupported(_)));
    }

    #[test]
    fn test_optional_record_inserts_default() {
        let mut optional: Option<Leaf> = None;
        let fields = optional.get_or_default().env_fields().len();
        assert_eq!(fields, 1);
        assert!(optional.is_some());
    }

    #[test]
    fn test_binding_debug_shows_kind() {
        let mut port: u16 = 1;
        let binding = FieldBinding::tagged("port", "PORT", port.env_slot());
        let debug = format!("{binding:?}");
        assert!(debug.contains("PORT"));
        assert!(debug.contains("Value(u16)"));
    }
}
