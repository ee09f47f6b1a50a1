//! Moderation rubrics and their ordered option sets.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{AuditError, Result};

/// One selectable label of a rubric together with what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOption {
    pub label: String,
    pub meaning: String,
}

/// Insertion-ordered mapping from choice label to choice meaning.
///
/// The order is the order in which options are shown to the model, so it is
/// kept exactly as given. Labels are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    entries: Vec<AuditOption>,
}

impl OptionSet {
    /// Build an option set from `(label, meaning)` pairs.
    ///
    /// Fails on empty or duplicate labels. An empty set is allowed here;
    /// rubrics reject it on construction.
    pub fn from_pairs<I, L, M>(pairs: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = (L, M)>,
        L: Into<String>,
        M: Into<String>,
    {
        let mut set = Self::default();
        for (label, meaning) in pairs {
            set.push(label.into(), meaning.into())?;
        }
        Ok(set)
    }

    fn push(&mut self, label: String, meaning: String) -> std::result::Result<(), String> {
        if label.trim().is_empty() {
            return Err("option labels must not be empty".to_string());
        }
        if self.contains(&label) {
            return Err(format!("duplicate option label '{label}'"));
        }
        self.entries.push(AuditOption { label, meaning });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|o| o.label == label)
    }

    /// Meaning of `label`, if the set offers it.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.meaning.as_str())
    }

    /// Labels in presentation order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|o| o.label.as_str())
    }

    #[must_use]
    pub fn first_label(&self) -> Option<&str> {
        self.entries.first().map(|o| o.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditOption> {
        self.entries.iter()
    }
}

impl Serialize for OptionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for option in &self.entries {
            map.serialize_entry(&option.label, &option.meaning)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OptionSetVisitor;

        impl<'de> Visitor<'de> for OptionSetVisitor {
            type Value = OptionSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of option label to meaning")
            }

            fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut set = OptionSet::default();
                while let Some((label, meaning)) = map.next_entry::<String, String>()? {
                    set.push(label, meaning).map_err(de::Error::custom)?;
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(OptionSetVisitor)
    }
}

/// A moderation rubric: a named criterion with an enumerated choice set.
///
/// Immutable after construction; the id is generated by the constructor.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOptionsItem {
    id: Uuid,
    name: String,
    instruction: String,
    options: OptionSet,
}

impl AuditOptionsItem {
    /// Create a rubric with a fresh id.
    ///
    /// # Errors
    /// `AuditError::InvalidItem` when the name or instruction is blank or the
    /// option set is empty.
    ///
    /// # Examples
    /// ```
    /// use content_audit::model::{AuditOptionsItem, OptionSet};
    ///
    /// let options = OptionSet::from_pairs([("yes", "contains ads"), ("no", "no ads")]).unwrap();
    /// let item = AuditOptionsItem::new("ads", "Does the text advertise?", options).unwrap();
    /// assert_eq!(item.options().first_label(), Some("yes"));
    /// ```
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        options: OptionSet,
    ) -> Result<Self> {
        let name = name.into();
        let instruction = instruction.into();

        let invalid = |reason: &str| AuditError::InvalidItem {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if instruction.trim().is_empty() {
            return Err(invalid("instruction must not be empty"));
        }
        if options.is_empty() {
            return Err(invalid("options must contain at least one entry"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            instruction,
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    #[must_use]
    pub fn options(&self) -> &OptionSet {
        &self.options
    }
}
