use serde::Deserialize;

/// Which shading kernel variant the pipeline is built against. The variant
/// suffix becomes part of the shade entry-point identifier at setup time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    #[default]
    Naive,
    MultipleImportanceSampling,
    DirectLighting,
}

impl ShadingMode {
    #[must_use]
    pub(crate) fn entry_point_suffix(&self) -> &'static str {
        match self {
            ShadingMode::Naive => "naive",
            ShadingMode::MultipleImportanceSampling => "mis",
            ShadingMode::DirectLighting => "direct",
        }
    }

    /// The light-sampling variants bind the geometry/light slot set on top of
    /// the common shade slots.
    #[must_use]
    pub(crate) fn uses_light_sampling(&self) -> bool {
        matches!(self, ShadingMode::MultipleImportanceSampling | ShadingMode::DirectLighting)
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub shading_mode: ShadingMode,
    /// divisor applied to raw pan deltas before they move the camera
    pub gesture_damping: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shading_mode: ShadingMode::default(),
            gesture_damping: 100.0,
        }
    }
}

impl RenderSettings {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
