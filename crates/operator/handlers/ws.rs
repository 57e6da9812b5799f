pub use telemetry_hub::ws::{ws_index, ws_named_topic};
