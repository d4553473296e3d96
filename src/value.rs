use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// One node of an assembled job structure.
///
/// The engine's job trees mix scalars, positional groups (`Items`, 1-based in
/// the emitted syntax), keyed groups (`Fields`, iteration order = insertion
/// order), and homogeneous file lists (`Files`, a distinct leaf with its own
/// brace-array syntax).
#[derive(Clone, Debug, PartialEq)]
pub enum JobValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Items(Vec<JobValue>),
    Fields(Vec<(String, JobValue)>),
    Files(Vec<String>),
}

impl JobValue {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Key lookup on a `Fields` node. `None` for every other variant.
    pub fn field(&self, key: &str) -> Option<&JobValue> {
        match self {
            Self::Fields(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Replace-or-append into an ordered field list, preserving insertion order.
pub fn insert_field(entries: &mut Vec<(String, JobValue)>, key: impl Into<String>, value: JobValue) {
    let key = key.into();
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key, value)),
    }
}

impl Serialize for JobValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Items(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Fields(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Files(files) => {
                let mut seq = serializer.serialize_seq(Some(files.len()))?;
                for f in files {
                    seq.serialize_element(f)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_finds_entries_in_order() {
        let v = JobValue::Fields(vec![
            ("a".to_string(), JobValue::Int(1)),
            ("b".to_string(), JobValue::Int(2)),
        ]);
        assert_eq!(v.field("b"), Some(&JobValue::Int(2)));
        assert_eq!(v.field("c"), None);
        assert_eq!(JobValue::Int(0).field("a"), None);
    }

    #[test]
    fn insert_field_replaces_without_reordering() {
        let mut entries = vec![
            ("x".to_string(), JobValue::Int(1)),
            ("y".to_string(), JobValue::Int(2)),
        ];
        insert_field(&mut entries, "x", JobValue::Int(9));
        insert_field(&mut entries, "z", JobValue::Int(3));
        assert_eq!(entries[0], ("x".to_string(), JobValue::Int(9)));
        assert_eq!(entries[2].0, "z");
    }

    #[test]
    fn fields_serialize_as_json_objects_in_insertion_order() {
        let v = JobValue::Fields(vec![
            ("zeta".to_string(), JobValue::Float(1.5)),
            ("alpha".to_string(), JobValue::Files(vec!["a.nii,1".to_string()])),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"zeta":1.5,"alpha":["a.nii,1"]}"#);
    }
}
