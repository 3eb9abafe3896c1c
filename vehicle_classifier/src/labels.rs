use std::fmt;

/// Vehicle categories the inference backend can return, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleLabel {
    AutoRickshaws,
    Bikes,
    Cars,
    Motorcycles,
    Planes,
    Ships,
    Trains,
}

pub const LABEL_SET: [VehicleLabel; 7] = [
    VehicleLabel::AutoRickshaws,
    VehicleLabel::Bikes,
    VehicleLabel::Cars,
    VehicleLabel::Motorcycles,
    VehicleLabel::Planes,
    VehicleLabel::Ships,
    VehicleLabel::Trains,
];

impl VehicleLabel {
    /// Name used by the backend as key in `all_predictions`.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleLabel::AutoRickshaws => "Auto Rickshaws",
            VehicleLabel::Bikes => "Bikes",
            VehicleLabel::Cars => "Cars",
            VehicleLabel::Motorcycles => "Motorcycles",
            VehicleLabel::Planes => "Planes",
            VehicleLabel::Ships => "Ships",
            VehicleLabel::Trains => "Trains",
        }
    }
}

impl fmt::Display for VehicleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
