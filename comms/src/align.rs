/// Primitive element types whose alignment is at least 4 bytes.
///
/// Receive buffers are made of these so the bytes that follow the 4 byte kind
/// header can be reinterpreted as `f32` without copying.
pub trait Align4: bytemuck::Pod {}

impl Align4 for u32 {}
impl Align4 for i32 {}
impl Align4 for u64 {}
impl Align4 for i64 {}
impl Align4 for f32 {}
impl Align4 for f64 {}
