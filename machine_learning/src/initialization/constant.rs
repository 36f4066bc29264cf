use super::ParamGen;

/// Sets every parameter it reaches to the same value.
pub struct ConstParamGen {
    value: f32,
    budget: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen`.
    ///
    /// # Arguments
    /// * `value` - The value every parameter starts at.
    /// * `limit` - How many parameters it can set before running dry.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            budget: limit,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.budget);
        out[..n].fill(self.value);
        self.budget -= n;
        n
    }
}
