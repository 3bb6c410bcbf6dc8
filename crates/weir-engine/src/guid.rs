use serde::{Deserialize, Serialize};
use std::fmt;

/// 16-byte identifier used by the engine for layers, condition fields,
/// providers and sublayers. Stored in the split layout the engine uses on
/// the wire rather than as a flat `[u8; 16]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == ZERO_GUID
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Absent sublayers and providers are reported by the engine as the zero id.
pub const ZERO_GUID: Guid = Guid::new(0, 0, 0, [0; 8]);

// The four authorization layers this tool works with. The engine exposes
// more classification points than these, but weir only installs into and
// enumerates the connect/receive authorization layers.
pub const LAYER_AUTH_CONNECT_V4: Guid = Guid::new(
    0x5ab1_e2c4,
    0x90fa,
    0x4d07,
    [0x82, 0x4f, 0x11, 0x9c, 0x3a, 0x0d, 0x6a, 0xe1],
);
pub const LAYER_AUTH_CONNECT_V6: Guid = Guid::new(
    0x5ab1_e2c5,
    0x90fa,
    0x4d07,
    [0x82, 0x4f, 0x11, 0x9c, 0x3a, 0x0d, 0x6a, 0xe2],
);
pub const LAYER_AUTH_RECV_V4: Guid = Guid::new(
    0x5ab1_e2c6,
    0x90fa,
    0x4d07,
    [0x82, 0x4f, 0x11, 0x9c, 0x3a, 0x0d, 0x6a, 0xe3],
);
pub const LAYER_AUTH_RECV_V6: Guid = Guid::new(
    0x5ab1_e2c7,
    0x90fa,
    0x4d07,
    [0x82, 0x4f, 0x11, 0x9c, 0x3a, 0x0d, 0x6a, 0xe4],
);

/// Enumeration order for commands that walk every authorization layer.
pub const AUTH_LAYERS: [Guid; 4] = [
    LAYER_AUTH_CONNECT_V4,
    LAYER_AUTH_CONNECT_V6,
    LAYER_AUTH_RECV_V4,
    LAYER_AUTH_RECV_V6,
];

// Condition field identifiers.
pub const FIELD_APP_ID: Guid = Guid::new(
    0xd78e_0a01,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x01],
);
pub const FIELD_LOCAL_IP: Guid = Guid::new(
    0xd78e_0a02,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x02],
);
pub const FIELD_LOCAL_PORT: Guid = Guid::new(
    0xd78e_0a03,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x03],
);
pub const FIELD_REMOTE_IP: Guid = Guid::new(
    0xd78e_0a04,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x04],
);
pub const FIELD_REMOTE_PORT: Guid = Guid::new(
    0xd78e_0a05,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x05],
);
pub const FIELD_PROTOCOL: Guid = Guid::new(
    0xd78e_0a06,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x06],
);
pub const FIELD_LOCAL_INTERFACE: Guid = Guid::new(
    0xd78e_0a07,
    0x23b9,
    0x47e2,
    [0x9e, 0x51, 0x70, 0x2c, 0x84, 0x55, 0x01, 0x07],
);

// Filters installed by this tool hang off a fixed provider and sublayer so
// they can be found (and bulk-deleted) later.
pub const WEIR_PROVIDER_KEY: Guid = Guid::new(
    0x93f2_41de,
    0x6b0a,
    0x41c8,
    [0xa5, 0x3e, 0x02, 0x77, 0xb1, 0x9f, 0x6c, 0x10],
);
pub const WEIR_SUBLAYER_KEY: Guid = Guid::new(
    0x93f2_41df,
    0x6b0a,
    0x41c8,
    [0xa5, 0x3e, 0x02, 0x77, 0xb1, 0x9f, 0x6c, 0x11],
);
