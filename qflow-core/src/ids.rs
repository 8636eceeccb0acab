use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
            Default,
        )]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }
    };
}

string_id!(RequestId);
string_id!(ConversationId);
string_id!(TenantId);
string_id!(UserId);
string_id!(DataSourceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn id_roundtrips_through_serde() {
        let id = TenantId::new("tenant_42");
        let json = serde_json::to_string(&id).unwrap();
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn id_displays_as_inner_string() {
        let id = UserId::new("u_1");
        assert_eq!(id.to_string(), "u_1");
    }
}
