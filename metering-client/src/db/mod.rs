pub mod household_queries;
pub mod memory;

pub use household_queries::PgConsumptionRepository;
pub use memory::InMemoryRepository;
