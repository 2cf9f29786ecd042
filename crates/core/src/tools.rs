//! Data-driven tool registry.
//!
//! Each generation capability ("tool") the product exposes is a row in
//! [`TOOLS`]: which provider endpoint it submits to, how caller
//! parameters populate the provider's generic field list, and which media
//! kinds its outputs are expected to be. The orchestrator never branches
//! per tool — adding a capability is adding a row here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::MediaKind;
use crate::error::OrchestrationError;

/// Where a submission field takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Copied from the caller's `params` object under this key. Omitted
    /// from the field list when the key is absent (optional knobs).
    Param(&'static str),
    /// Replaced by the provider asset id of the uploaded input asset
    /// registered under this key.
    AssetRef(&'static str),
    /// A constant value baked into the tool definition.
    Fixed(&'static str),
}

/// One entry of the provider's generic field list for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    /// Field name expected by the provider endpoint.
    pub name: &'static str,
    pub source: FieldSource,
}

/// Static description of a single generation capability.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Stable identifier used by callers and cache keys.
    pub id: &'static str,
    /// Provider submission endpoint suffix.
    pub endpoint: &'static str,
    /// Caller parameters that must be present and non-empty.
    pub required_params: &'static [&'static str],
    /// How the submission field list is populated.
    pub fields: &'static [FieldBinding],
    /// Media kinds the finished task is expected to produce.
    pub expected_outputs: &'static [MediaKind],
}

impl ToolSpec {
    /// Asset keys this tool requires to be uploaded before submission.
    pub fn required_assets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter_map(|binding| match binding.source {
            FieldSource::AssetRef(key) => Some(key),
            _ => None,
        })
    }

    /// Human-readable list of expected output kinds, for error messages.
    pub fn expected_outputs_label(&self) -> String {
        self.expected_outputs
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Every tool the product currently exposes.
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        id: "text-to-image",
        endpoint: "text-to-image",
        required_params: &["prompt"],
        fields: &[
            FieldBinding { name: "prompt", source: FieldSource::Param("prompt") },
            FieldBinding { name: "negativePrompt", source: FieldSource::Param("negative_prompt") },
            FieldBinding { name: "stylePreset", source: FieldSource::Param("style") },
            FieldBinding { name: "outputFormat", source: FieldSource::Fixed("png") },
        ],
        expected_outputs: &[MediaKind::Image],
    },
    ToolSpec {
        id: "image-to-image",
        endpoint: "image-to-image",
        required_params: &["prompt"],
        fields: &[
            FieldBinding { name: "prompt", source: FieldSource::Param("prompt") },
            FieldBinding { name: "sourceImage", source: FieldSource::AssetRef("image") },
            FieldBinding { name: "strength", source: FieldSource::Param("strength") },
        ],
        expected_outputs: &[MediaKind::Image],
    },
    ToolSpec {
        id: "text-to-video",
        endpoint: "text-to-video",
        required_params: &["prompt"],
        fields: &[
            FieldBinding { name: "prompt", source: FieldSource::Param("prompt") },
            FieldBinding { name: "durationSeconds", source: FieldSource::Param("duration_secs") },
        ],
        expected_outputs: &[MediaKind::Video],
    },
    ToolSpec {
        id: "image-upscale",
        endpoint: "image-upscale",
        required_params: &[],
        fields: &[
            FieldBinding { name: "sourceImage", source: FieldSource::AssetRef("image") },
            FieldBinding { name: "scaleFactor", source: FieldSource::Param("scale") },
        ],
        expected_outputs: &[MediaKind::Image],
    },
];

/// Look up a tool by its identifier.
pub fn lookup_tool(id: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.id == id)
}

/// One name/value pair of the provider's generic submission format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitField {
    pub name: String,
    pub value: Value,
}

/// Check the caller-supplied params against the tool's requirements.
///
/// Runs before any network call; a failure here never reaches the
/// transport layer.
pub fn validate_params(tool: &ToolSpec, params: &Value) -> Result<(), OrchestrationError> {
    let object = params.as_object().ok_or_else(|| {
        OrchestrationError::Validation("params must be a JSON object".to_string())
    })?;

    for &key in tool.required_params {
        let present = match object.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(OrchestrationError::Validation(format!(
                "missing required parameter '{key}' for tool '{}'",
                tool.id
            )));
        }
    }
    Ok(())
}

/// Build the provider field list for a submission.
///
/// `asset_ids` maps asset keys to the provider-assigned ids of already
/// uploaded assets; every `AssetRef` binding must be satisfied by it.
/// Optional `Param` bindings are omitted when absent or null.
pub fn build_fields(
    tool: &ToolSpec,
    params: &Value,
    asset_ids: &HashMap<String, String>,
) -> Result<Vec<SubmitField>, OrchestrationError> {
    let mut fields = Vec::with_capacity(tool.fields.len());

    for binding in tool.fields {
        match binding.source {
            FieldSource::Param(key) => match params.get(key) {
                None | Some(Value::Null) => {
                    if tool.required_params.contains(&key) {
                        return Err(OrchestrationError::Validation(format!(
                            "missing required parameter '{key}' for tool '{}'",
                            tool.id
                        )));
                    }
                }
                Some(value) => fields.push(SubmitField {
                    name: binding.name.to_string(),
                    value: value.clone(),
                }),
            },
            FieldSource::AssetRef(key) => {
                let asset_id = asset_ids.get(key).ok_or_else(|| {
                    OrchestrationError::Validation(format!(
                        "no uploaded asset for '{key}' in tool '{}'",
                        tool.id
                    ))
                })?;
                fields.push(SubmitField {
                    name: binding.name.to_string(),
                    value: Value::String(asset_id.clone()),
                });
            }
            FieldSource::Fixed(value) => fields.push(SubmitField {
                name: binding.name.to_string(),
                value: Value::String(value.to_string()),
            }),
        }
    }
    Ok(fields)
}
