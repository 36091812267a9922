//! Object identities and the integer-coded kinds used by the host

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::KernelError;

/// Identity of an object in the object tree
///
/// Identity 0 is the implicit root and always exists once the registry
/// has been reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    /// The root object
    pub const ROOT: ObjectId = ObjectId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl From<ObjectId> for i64 {
    fn from(id: ObjectId) -> Self {
        i64::from(id.0)
    }
}

/// Declares a host enum that travels as a plain integer
macro_rules! integer_kind {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            /// Integer code used by the host
            pub const fn code(self) -> i64 {
                self as i64
            }
        }

        impl TryFrom<i64> for $name {
            type Error = KernelError;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(KernelError::UnsupportedType {
                        kind: stringify!($name),
                        code,
                    }),
                }
            }
        }

        impl From<$name> for i64 {
            fn from(kind: $name) -> Self {
                kind.code()
            }
        }
    };
}

integer_kind! {
    /// Kind of an object in the tree
    ObjectType {
        Category = 0,
        Instance = 1,
        Variable = 2,
        Script = 3,
        Event = 4,
        Media = 5,
        Link = 6,
    }
}

integer_kind! {
    /// Declared type of a variable, property or attribute
    VariableType {
        Boolean = 0,
        Integer = 1,
        Float = 2,
        String = 3,
    }
}

integer_kind! {
    /// Kind of a module as declared in its manifest
    ModuleType {
        Core = 0,
        Io = 1,
        Splitter = 2,
        Device = 3,
        Configurator = 4,
        Discovery = 5,
    }
}

integer_kind! {
    ScriptType {
        Php = 0,
    }
}

integer_kind! {
    MediaType {
        Dashboard = 0,
        Image = 1,
        Sound = 2,
        Stream = 3,
        Chart = 4,
        Document = 5,
    }
}

integer_kind! {
    EventType {
        Trigger = 0,
        Cyclic = 1,
        Schedule = 2,
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableType::Boolean => "boolean",
            VariableType::Integer => "integer",
            VariableType::Float => "float",
            VariableType::String => "string",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_identity() {
        assert!(ObjectId::ROOT.is_root());
        assert!(!ObjectId::new(10000).is_root());
        assert_eq!(ObjectId::new(12345).to_string(), "12345");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ObjectType::Link.code(), 6);
        assert_eq!(VariableType::try_from(2).unwrap(), VariableType::Float);
        assert_eq!(ModuleType::try_from(5).unwrap(), ModuleType::Discovery);
    }

    #[test]
    fn test_unknown_code_is_unsupported() {
        let err = VariableType::try_from(4).unwrap_err();
        assert!(matches!(
            err,
            KernelError::UnsupportedType {
                kind: "VariableType",
                code: 4
            }
        ));
    }

    #[test]
    fn test_kind_serializes_as_integer() {
        let json = serde_json::to_string(&ModuleType::Device).unwrap();
        assert_eq!(json, "3");
        let parsed: ObjectType = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, ObjectType::Instance);
        assert!(serde_json::from_str::<ObjectType>("9").is_err());
    }
}
