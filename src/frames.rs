//! Frame enumeration.
//!
//! The engine addresses one time-point of a volume as `<path>,<index>` with
//! 1-based indices. A 3-D volume is a single frame and gets the same `,1`
//! suffix a 4-D volume's first frame would.

use std::path::Path;

use crate::{
    error::{SpmError, SpmResult},
    value::JobValue,
    volume::VolumeSource,
};

/// Opaque engine file reference: `<path>,<1-based frame index>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRef(String);

impl FrameRef {
    pub fn new(path: &Path, index: u64) -> Self {
        Self(format!("{},{index}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FrameRef> for String {
    fn from(r: FrameRef) -> Self {
        r.0
    }
}

/// One reference per temporal frame of the volume at `path`.
pub fn frame_refs(source: &dyn VolumeSource, path: &Path) -> SpmResult<Vec<FrameRef>> {
    let shape = source.shape(path)?;
    match shape.len() {
        3 => Ok(vec![FrameRef::new(path, 1)]),
        4 => Ok((1..=shape[3]).map(|i| FrameRef::new(path, i)).collect()),
        rank => Err(SpmError::data_access(format!(
            "'{}' has unsupported rank {rank} (expected 3 or 4 dimensions)",
            path.display()
        ))),
    }
}

/// One inner sequence per input path, in input order.
pub fn frame_refs_many<P: AsRef<Path>>(
    source: &dyn VolumeSource,
    paths: &[P],
) -> SpmResult<Vec<Vec<FrameRef>>> {
    paths
        .iter()
        .map(|p| frame_refs(source, p.as_ref()))
        .collect()
}

/// A flat session as a job file-list leaf.
pub fn session_value(refs: Vec<FrameRef>) -> JobValue {
    JobValue::Files(refs.into_iter().map(String::from).collect())
}

/// Multiple sessions as an ordered group of file-list leaves.
pub fn sessions_value(sessions: Vec<Vec<FrameRef>>) -> JobValue {
    JobValue::Items(sessions.into_iter().map(session_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedShapes(HashMap<String, Vec<u64>>);

    impl VolumeSource for FixedShapes {
        fn shape(&self, path: &Path) -> SpmResult<Vec<u64>> {
            self.0
                .get(path.to_str().unwrap_or_default())
                .cloned()
                .ok_or_else(|| SpmError::data_access("unknown volume"))
        }
    }

    fn shapes(entries: &[(&str, &[u64])]) -> FixedShapes {
        FixedShapes(
            entries
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn three_d_volume_yields_one_indexed_ref() {
        let src = shapes(&[("anat.nii", &[64, 64, 30])]);
        let refs = frame_refs(&src, Path::new("anat.nii")).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].as_str(), "anat.nii,1");
    }

    #[test]
    fn four_d_volume_yields_one_ref_per_frame() {
        let src = shapes(&[("bold.nii", &[64, 64, 30, 120])]);
        let refs = frame_refs(&src, Path::new("bold.nii")).unwrap();
        assert_eq!(refs.len(), 120);
        assert_eq!(refs[0].as_str(), "bold.nii,1");
        assert_eq!(refs[119].as_str(), "bold.nii,120");
    }

    #[test]
    fn unsupported_rank_is_a_data_access_error() {
        let src = shapes(&[("flat.nii", &[64, 64])]);
        let err = frame_refs(&src, Path::new("flat.nii")).unwrap_err();
        assert!(matches!(err, SpmError::DataAccess(_)));
        assert!(err.to_string().contains("rank 2"));
    }

    #[test]
    fn many_preserves_input_order() {
        let src = shapes(&[
            ("s1.nii", &[64, 64, 30, 2]),
            ("s2.nii", &[64, 64, 30]),
        ]);
        let sessions = frame_refs_many(&src, &["s1.nii", "s2.nii"]).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1][0].as_str(), "s2.nii,1");
    }

    #[test]
    fn session_values_build_file_leaves() {
        let refs = vec![
            FrameRef::new(Path::new("a.nii"), 1),
            FrameRef::new(Path::new("a.nii"), 2),
        ];
        assert_eq!(
            session_value(refs.clone()),
            JobValue::Files(vec!["a.nii,1".to_string(), "a.nii,2".to_string()])
        );
        let grouped = sessions_value(vec![refs]);
        assert!(matches!(grouped, JobValue::Items(ref v) if v.len() == 1));
    }
}
