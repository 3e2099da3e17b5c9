//! Rendered recipe metadata.
//!
//! A [`Recipe`] is the typed view of a rendered `meta.yaml`: package name and
//! version, the build `skip` flag, per-stage requirement lists and the named
//! sub-outputs. Deserialization is deliberately forgiving:
//!
//! - scalar text fields keep their source text (`1.10` stays `"1.10"`)
//! - unknown keys are ignored
//! - duplicate keys, which appear when several selector lines survive, keep
//!   the last value
//! - `null` sections and non-mapping sections read as empty
//!
//! Requirement entries are kept as raw YAML values; only string entries are
//! dependency candidates (see [`extractor`]).

pub mod extractor;

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

pub use extractor::{DependencyFilter, DependencySpec, Stage, extract, extract_all, extract_specs};

/// Rendered structured metadata of one feedstock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    pub package: PackageSection,
    pub build: BuildSection,
    pub requirements: Requirements,
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSection {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSection {
    pub skip: bool,
}

/// Requirement lists per stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirements {
    pub build: Vec<serde_yaml::Value>,
    pub host: Vec<serde_yaml::Value>,
    pub run: Vec<serde_yaml::Value>,
}

/// A named sub-output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub name: Option<String>,
    pub requirements: Requirements,
}

impl Recipe {
    /// Parse rendered YAML. Blank or comment-only text is an empty recipe.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let has_content = text.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#') && line != "---"
        });
        if !has_content {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn name(&self) -> Option<&str> {
        self.package.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.package.version.as_deref()
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name.as_deref() == Some(name))
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().filter_map(|o| o.name.as_deref())
    }
}

/// Scalar read as its source text.
struct Text(String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextVisitor;

        impl Visitor<'_> for TextVisitor {
            type Value = Text;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Text, E> {
                Ok(Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Text, E> {
                Ok(Text(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Text, E> {
                Ok(Text(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Text, E> {
                Ok(Text(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Text, E> {
                Ok(Text(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Text, E> {
                Ok(Text(v.to_string()))
            }
        }

        deserializer.deserialize_str(TextVisitor)
    }
}

fn is_truthy(text: &str) -> bool {
    matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1")
}

/// A mapping section filled key by key.
trait Section: Default {
    const NAME: &'static str;

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error>;
}

/// Accepts a mapping for `T`; any other shape yields `T::default()`.
struct SectionVisitor<T>(PhantomData<T>);

impl<'de, T: Section> Visitor<'de> for SectionVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} mapping", T::NAME)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
        let mut section = T::default();
        while let Some(Text(key)) = map.next_key::<Text>()? {
            section.assign(&key, &mut map)?;
        }
        Ok(section)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<T, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(T::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<T, E> {
        Ok(T::default())
    }
}

macro_rules! section_deserialize {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SectionVisitor::<$ty>(PhantomData))
            }
        }
    };
}

section_deserialize!(Recipe);
section_deserialize!(PackageSection);
section_deserialize!(BuildSection);
section_deserialize!(Output);

impl Section for Recipe {
    const NAME: &'static str = "recipe";

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "package" => self.package = map.next_value()?,
            "build" => self.build = map.next_value()?,
            "requirements" => self.requirements = map.next_value()?,
            "outputs" => self.outputs = map.next_value::<Entries<Output>>()?.0,
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl Section for PackageSection {
    const NAME: &'static str = "package";

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "name" => self.name = map.next_value::<Option<Text>>()?.map(|t| t.0),
            "version" => self.version = map.next_value::<Option<Text>>()?.map(|t| t.0),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl Section for BuildSection {
    const NAME: &'static str = "build";

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "skip" => {
                self.skip = map.next_value::<Option<Text>>()?.is_some_and(|t| is_truthy(&t.0));
            }
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl Section for Output {
    const NAME: &'static str = "output";

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "name" => self.name = map.next_value::<Option<Text>>()?.map(|t| t.0),
            "requirements" => self.requirements = map.next_value()?,
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl Section for Requirements {
    const NAME: &'static str = "requirements";

    fn assign<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "build" => self.build = map.next_value::<Entries<serde_yaml::Value>>()?.0,
            "host" => self.host = map.next_value::<Entries<serde_yaml::Value>>()?.0,
            "run" => self.run = map.next_value::<Entries<serde_yaml::Value>>()?.0,
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Requirements {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequirementsVisitor;

        impl<'de> Visitor<'de> for RequirementsVisitor {
            type Value = Requirements;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a requirements mapping or list")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Requirements, A::Error> {
                SectionVisitor::<Requirements>(PhantomData).visit_map(map)
            }

            // A bare list means run requirements.
            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Requirements, A::Error> {
                let mut run = Vec::new();
                while let Some(entry) = seq.next_element()? {
                    run.push(entry);
                }
                Ok(Requirements {
                    run,
                    ..Requirements::default()
                })
            }

            fn visit_unit<E: de::Error>(self) -> Result<Requirements, E> {
                Ok(Requirements::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Requirements, E> {
                Ok(Requirements::default())
            }

            fn visit_str<E: de::Error>(self, _: &str) -> Result<Requirements, E> {
                Ok(Requirements::default())
            }
        }

        deserializer.deserialize_any(RequirementsVisitor)
    }
}

/// A list that also accepts `null` (empty) and a single scalar (one entry).
struct Entries<T>(Vec<T>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Entries<T>, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Entries(items))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Entries<T>, E> {
                Ok(Entries(Vec::new()))
            }

            fn visit_none<E: de::Error>(self) -> Result<Entries<T>, E> {
                Ok(Entries(Vec::new()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Entries<T>, E> {
                let item = T::deserialize(de::value::StrDeserializer::<E>::new(v))?;
                Ok(Entries(vec![item]))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries<T>, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(Entries(Vec::new()))
            }
        }

        deserializer.deserialize_any(EntriesVisitor(PhantomData))
    }
}
