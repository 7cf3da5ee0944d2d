use serde::{Deserialize, Deserializer};

/// Single field of a partial update.
///
/// Fields missing from the payload (or sent as `null`) deserialize to `Unset`
/// and leave the target value untouched. Struct fields of this type need
/// `#[serde(default)]`, otherwise serde reports them as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    /// Overwrites `target` if a value was supplied.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Unset,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

/// `deserialize_with` helper reading `null` as the type's default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
