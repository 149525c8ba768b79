//! Game entities and their construction.

mod factory;
mod food;
mod player;

pub use factory::EntityFactory;
pub use food::Food;
pub use player::Player;
