use serde_json::Value;

pub trait Displayable {
    fn display(&self);
}

/// Plain strings are printed as-is so they can be piped, anything else as
/// pretty JSON.
impl<T: serde::Serialize> Displayable for T {
    fn display(&self) {
        match serde_json::to_value(self) {
            Ok(Value::String(s)) => println!("{s}"),
            Ok(value) => println!(
                "{}",
                serde_json::to_string_pretty(&value).expect("a Value always serializes")
            ),
            Err(e) => log::error!("Cannot display the result: {e}"),
        }
    }
}
