//! Artifact binding
//!
//! A handler declares an ordered list of [`Replacer`]s, each owning one
//! artifact type and a set of manifest fields. [`ArtifactReplacer`] runs them
//! in two modes:
//!
//! - **replace**: rewrite fields that match a candidate artifact under the
//!   active [`BindingMode`] and report what was bound
//! - **find**: report every artifact currently referenced, never mutating
//!
//! ```text
//! manifest ──► Replacer 1 ──► Replacer 2 ──► ... ──► ReplaceResult
//!                 │               │                  (manifest, bound)
//!             candidates      candidates
//! ```

mod path;
mod replacer;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use kindling_core::{Artifact, Manifest};
use serde::{Deserialize, Serialize};

use crate::error::KubeError;

pub use path::FieldPath;
pub use replacer::Replacer;
pub(crate) use replacer::roots;

/// How a candidate image artifact is matched against an image in a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingMode {
    /// Image names match; the field takes the artifact's resolved reference
    MatchNameOnly,
    /// Image names match and the artifact pins a tag or digest
    #[default]
    MatchNameAndTag,
    /// The field already equals the artifact's resolved reference
    MatchExact,
}

impl BindingMode {
    pub const ALL: [BindingMode; 3] = [
        Self::MatchNameOnly,
        Self::MatchNameAndTag,
        Self::MatchExact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchNameOnly => "match-name-only",
            Self::MatchNameAndTag => "match-name-and-tag",
            Self::MatchExact => "match-exact",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingMode {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KubeError::UnknownBinding(s.to_string()))
    }
}

/// Outcome of a replacement pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceResult {
    /// The manifest after replacement
    pub manifest: Manifest,
    /// Candidates that were bound into at least one field
    pub bound_artifacts: BTreeSet<Artifact>,
}

/// Runs a fixed, ordered list of replacers
#[derive(Debug, Clone, Default)]
pub struct ArtifactReplacer {
    replacers: Vec<Replacer>,
}

impl ArtifactReplacer {
    pub fn new(replacers: Vec<Replacer>) -> Self {
        Self { replacers }
    }

    /// A replacer with no strategies
    pub const fn empty() -> Self {
        Self {
            replacers: Vec::new(),
        }
    }

    /// Bind candidate artifacts into the manifest
    ///
    /// With no replacers, or no matching candidate, the manifest comes back
    /// untouched with an empty bound set.
    pub fn replace_all(
        &self,
        mode: BindingMode,
        mut manifest: Manifest,
        candidates: &[Artifact],
        namespace: Option<&str>,
        account: &str,
    ) -> ReplaceResult {
        let mut bound_artifacts = BTreeSet::new();
        for replacer in &self.replacers {
            bound_artifacts.extend(replacer.replace(
                mode,
                &mut manifest,
                candidates,
                namespace,
                account,
            ));
        }

        if !bound_artifacts.is_empty() {
            tracing::debug!(
                manifest = %manifest.full_resource_name(),
                bound = bound_artifacts.len(),
                "bound artifacts"
            );
        }

        ReplaceResult {
            manifest,
            bound_artifacts,
        }
    }

    /// Every artifact the manifest currently references
    pub fn find_all(&self, manifest: &Manifest) -> BTreeSet<Artifact> {
        self.replacers
            .iter()
            .flat_map(|replacer| replacer.find(manifest))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindling_core::artifact::types;

    fn manifest(image: &str) -> Manifest {
        Manifest::from_yaml(&format!(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: app
  namespace: default
spec:
  template:
    spec:
      containers:
        - name: app
          image: {image}
      volumes:
        - name: cfg
          configMap:
            name: app-config
"#
        ))
        .unwrap()
    }

    fn replacer() -> ArtifactReplacer {
        ArtifactReplacer::new(Replacer::pod_spec_set(roots::POD_TEMPLATE))
    }

    #[test]
    fn test_binding_mode_parse() {
        assert_eq!(
            "match-name-only".parse::<BindingMode>().unwrap(),
            BindingMode::MatchNameOnly
        );
        assert_eq!(
            "MATCH-EXACT".parse::<BindingMode>().unwrap(),
            BindingMode::MatchExact
        );
        assert!(matches!(
            "fuzzy".parse::<BindingMode>(),
            Err(KubeError::UnknownBinding(_))
        ));
        assert_eq!(BindingMode::default(), BindingMode::MatchNameAndTag);
    }

    #[test]
    fn test_binding_mode_serde() {
        let mode: BindingMode = serde_yaml::from_str("match-name-only").unwrap();
        assert_eq!(mode, BindingMode::MatchNameOnly);
        assert_eq!(
            serde_json::to_string(&BindingMode::MatchNameAndTag).unwrap(),
            "\"match-name-and-tag\""
        );
    }

    #[test]
    fn test_name_and_tag_rewrites_tag() {
        let result = replacer().replace_all(
            BindingMode::MatchNameAndTag,
            manifest("app:v1"),
            &[Artifact::image("app").with_version("v2")],
            Some("default"),
            "acct",
        );

        assert_eq!(
            result
                .manifest
                .pointer("/spec/template/spec/containers/0/image")
                .and_then(|v| v.as_str()),
            Some("app:v2")
        );
        let names: Vec<_> = result.bound_artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["app"]);
    }

    #[test]
    fn test_non_matching_candidates_leave_manifest_unchanged() {
        let original = manifest("app:v1");
        let result = replacer().replace_all(
            BindingMode::MatchNameAndTag,
            original.clone(),
            &[
                Artifact::image("other").with_version("v2"),
                Artifact::new(types::CONFIG_MAP, "other-config").with_version("v1"),
            ],
            Some("default"),
            "acct",
        );

        assert_eq!(result.manifest, original);
        assert_eq!(
            serde_json::to_vec(&result.manifest).unwrap(),
            serde_json::to_vec(&original).unwrap()
        );
        assert!(result.bound_artifacts.is_empty());
    }

    #[test]
    fn test_no_replacers_is_a_no_op() {
        let original = manifest("app:v1");
        let result = ArtifactReplacer::default().replace_all(
            BindingMode::MatchNameOnly,
            original.clone(),
            &[Artifact::image("app").with_version("v2")],
            Some("default"),
            "acct",
        );
        assert_eq!(result.manifest, original);
        assert!(result.bound_artifacts.is_empty());
        assert!(ArtifactReplacer::default().find_all(&original).is_empty());
    }

    #[test]
    fn test_replace_images_and_config_in_one_pass() {
        let result = replacer().replace_all(
            BindingMode::MatchNameAndTag,
            manifest("app:v1"),
            &[
                Artifact::image("app").with_version("v7"),
                Artifact::new(types::CONFIG_MAP, "app-config")
                    .with_version("v004")
                    .with_location("default"),
            ],
            Some("default"),
            "acct",
        );

        assert_eq!(result.bound_artifacts.len(), 2);
        assert_eq!(
            result
                .manifest
                .pointer("/spec/template/spec/volumes/0/configMap/name")
                .and_then(|v| v.as_str()),
            Some("app-config-v004")
        );
    }

    #[test]
    fn test_find_all_is_read_only() {
        let manifest = manifest("gcr.io/app:v1");
        let before = manifest.clone();
        let found = replacer().find_all(&manifest);
        assert_eq!(manifest, before);

        let kinds: Vec<_> = found.iter().map(|a| a.artifact_type.as_str()).collect();
        assert_eq!(kinds, vec![types::DOCKER_IMAGE, types::CONFIG_MAP]);
    }
}
