//! Modbus Gateway
//!
//! IO instance with the gateway's configuration properties and no
//! transport behind it.

use ips_core::KernelResult;
use ips_kernel::{Module, ModuleClass, ModuleContext};

pub const MODBUS_GATEWAY_ID: &str = "{A5F663AB-C400-4FE5-B207-4D67CC030564}";

/// 0 TCP, 1 RTU, 2 RTU over TCP, 3 TCP over UDP, 4 SymBox RS485
pub const DEFAULT_GATEWAY_MODE: i64 = 0;

#[derive(Debug, Default)]
pub struct ModbusGateway;

impl ModbusGateway {
    pub fn class() -> ModuleClass {
        ModuleClass::new("ModbusGateway", || ModbusGateway)
    }
}

impl Module for ModbusGateway {
    fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.register_property_integer("GatewayMode", DEFAULT_GATEWAY_MODE)?;
        ctx.register_property_integer("DeviceID", 1)?;
        // Swap LSW/MSW of 32/64 bit values
        ctx.register_property_boolean("SwapWords", true)
    }
}
