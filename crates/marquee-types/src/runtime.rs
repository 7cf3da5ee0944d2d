use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};

/// Movie runtime in minutes.
///
/// Written to JSON as `"<minutes> mins"`, read from a plain JSON integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(self) -> i32 {
        self.0
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
