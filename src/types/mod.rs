pub use self::data_map::DataMap;
pub use self::route_params::RouteParams;

mod data_map;
mod route_params;
