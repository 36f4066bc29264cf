/// A source of values for the initial parameters of a model.
///
/// A generator may only hold a limited amount of values, `Parameters::generate`
/// fails if it runs dry before every parameter is set.
pub trait ParamGen {
    /// Writes the next values into the front of `out`.
    ///
    /// # Returns
    /// The amount of values written, zero once the generator is exhausted.
    fn fill(&mut self, out: &mut [f32]) -> usize;
}
