pub mod implicit;
pub mod schedule_dag;

pub use implicit::has_implicit_cycle;
pub use schedule_dag::ScheduleDag;
