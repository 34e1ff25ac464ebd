pub type PosType = u64;
pub type CountType = u32;
pub type PValueType = f64;
