pub mod describe;
pub mod pipeline;
pub mod recaption;
pub mod rules;

pub use describe::Describer;
pub use pipeline::Pipeline;
pub use recaption::Recaptioner;
pub use rules::load_material_rules;
