/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Separator between the consuming component and the rest of a property path.
    pub component_separator: char,

    /// Maximum number of notification rounds a single dispatch may run.
    /// Listeners can register modifiers while handling a notice, which queues
    /// further notices; a dispatch that never settles is a bug.
    pub max_dispatch_rounds: u32,

    /// Decimal places used when presenting hypothetical (template) values.
    pub template_precision: u32,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_COMPONENT_SEPARATOR: char = '/';
    pub const DEFAULT_MAX_DISPATCH_ROUNDS: u32 = 16;
    pub const DEFAULT_TEMPLATE_PRECISION: u32 = 8;

    pub fn new() -> Self {
        Self {
            component_separator: Self::DEFAULT_COMPONENT_SEPARATOR,
            max_dispatch_rounds: Self::DEFAULT_MAX_DISPATCH_ROUNDS,
            template_precision: Self::DEFAULT_TEMPLATE_PRECISION,
        }
    }

    pub fn with_max_dispatch_rounds(mut self, rounds: u32) -> Self {
        self.max_dispatch_rounds = rounds.max(1);
        self
    }

    /// Rounds a hypothetical value to [`Self::template_precision`] decimals.
    ///
    /// Products like `3 × 1.1` carry representation noise; tooltips and AI
    /// lookahead compare values after this rounding. Non-finite values, and
    /// values too large to scale, come back unchanged.
    pub fn round_template_value(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.template_precision.min(15) as i32);
        let scaled = value * scale;
        if !scaled.is_finite() {
            return value;
        }
        scaled.round() / scale
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
