//! Fixed device addresses
//!
//! The host sees three regions: the SPI-only control registers (command,
//! status and scratch bytes), the core control registers of both CPUs, and
//! the CPU memories reached through the AHB bridge (program memory, mailbox
//! windows and firmware data).

/// First byte of the scratch register array. Scratch register `n` lives at
/// `SCRATCH_BASE + n`.
pub const SCRATCH_BASE: u32 = 0x0000_0100;

/// Highest valid scratch register index
pub const SCRATCH_MAX: u8 = 216;

/// Registers and memory locations of CPU0
pub mod cpu0 {
    /// Command register. Writing a link ID triggers the mailbox command.
    pub const COMMAND: u32 = 0x0000_00C0;
    /// Four extended command bytes
    pub const EXT_COMMAND: u32 = 0x0000_00C1;
    /// Busy flags for the command register
    pub const COMMAND_BUSY: u32 = 0x0000_00C5;
    /// Command status nibbles, one per link
    pub const COMMAND_STATUS: u32 = 0x0000_00C8;

    /// Core control 1 (run bit)
    pub const CTL_1: u32 = 0x0000_0080;
    /// Core control 2 (AHB error masks)
    pub const CTL_2: u32 = 0x0000_0081;
    /// Boot address register
    pub const BOOT_ADDR: u32 = 0x0000_0084;
    /// Initial stack pointer register
    pub const STACK_PTR: u32 = 0x0000_0088;
    /// Memory bank control register
    pub const MEM_BANK_CTRL: u32 = 0x0000_008C;

    /// Program memory start
    pub const PROG_START: u32 = 0x0100_0000;
    /// Data memory mailbox window
    pub const MAILBOX: u32 = 0x2002_0000;
    /// Firmware version block
    pub const VERSION: u32 = 0x0100_0200;
    /// Exception flag word written by the firmware
    pub const EXCEPTION_FLAG: u32 = 0x0100_021C;
}

/// Registers and memory locations of CPU1
pub mod cpu1 {
    /// Command register. Writing a link ID triggers the mailbox command.
    pub const COMMAND: u32 = 0x0000_00D0;
    /// Four extended command bytes
    pub const EXT_COMMAND: u32 = 0x0000_00D1;
    /// Busy flags for the command register
    pub const COMMAND_BUSY: u32 = 0x0000_00D5;
    /// Command status nibbles, one per link
    pub const COMMAND_STATUS: u32 = 0x0000_00D8;

    /// Core control register
    pub const CTL_1: u32 = 0x0000_0090;
    /// Boot address register
    pub const BOOT_ADDR: u32 = 0x0000_0094;
    /// Initial stack pointer register
    pub const STACK_PTR: u32 = 0x0000_0098;
    /// Memory bank control register
    pub const MEM_BANK_CTRL: u32 = 0x0000_009C;

    /// Program memory start
    pub const PROG_START: u32 = 0x0200_0000;
    /// Data memory mailbox window
    pub const MAILBOX: u32 = 0x2102_0000;
    /// Firmware version block (mirrors CPU0)
    pub const VERSION: u32 = 0x0100_0200;
    /// Exception flag word written by the firmware
    pub const EXCEPTION_FLAG: u32 = 0x0200_021C;
}

/// Debug control register holding the global breakpoint resume bit
pub const DBG_CTL: u32 = 0x0000_00E0;

/// Value written to both memory bank control registers at init
pub const MEM_BANK_CTRL_INIT: u8 = 0x02;

/// Size in bytes of each CPU mailbox window
pub const MAILBOX_SIZE: usize = 512;

/// Firmware-embedded locations
///
/// These are absolute addresses inside program memory. Their offset inside
/// the image is the address masked with [`PM_OFFSET_MASK`](image::PM_OFFSET_MASK).
pub mod image {
    /// Masks an absolute program memory address down to an image offset
    pub const PM_OFFSET_MASK: u32 = 0x000F_FFFF;

    /// CPU0 firmware version quad (major, minor, maintenance, build)
    pub const PM_DEVICE_REV_DATA: u32 = 0x0100_0180;
    /// CPU1 pointer to the device profile buffer
    pub const PM_DEVICE_PROFILE_PTR: u32 = 0x0200_0190;
    /// Size in bytes of the device profile buffer
    pub const DEVICE_PROFILE_SIZE: u32 = 2440;
    /// CPU0 pointer to the debug configuration buffer
    pub const PM_DEBUG_CONFIG_PTR: u32 = 0x0100_01A0;

    /// Pointer to the software breakpoint table
    pub const PM_SW_BKPT_TABLE_PTR: u32 = 0x0100_0210;
    /// Pointer to the global breakpoint halt mask word
    pub const PM_SW_BKPT_GLOBAL_HALT_MASK_PTR: u32 = 0x0100_0214;
    /// Pointer to the CPU0 efuse settings block
    pub const CPU0_PM_EFUSE_SETTINGS_PTR: u32 = 0x0100_0218;

    /// Image offset of an absolute program memory address
    pub const fn offset_of(addr: u32) -> u32 {
        addr & PM_OFFSET_MASK
    }
}

/// Named scratch register indices
pub mod scratch {
    /// CPU0 boot status
    pub const CPU0_BOOT_STATUS: u8 = 0;
    /// CPU1 boot status
    pub const CPU1_BOOT_STATUS: u8 = 1;
    /// CPU0 breakpoint hit: table index
    pub const CPU0_BKPT_HIT_INDEX: u8 = 10;
    /// CPU0 breakpoint hit: breakpoint number
    pub const CPU0_BKPT_HIT_NUMBER: u8 = 11;
    /// CPU0 breakpoint hit: channel number
    pub const CPU0_BKPT_HIT_CHANNEL: u8 = 12;
    /// CPU1 breakpoint hit: table index
    pub const CPU1_BKPT_HIT_INDEX: u8 = 13;
    /// CPU1 breakpoint hit: breakpoint number
    pub const CPU1_BKPT_HIT_NUMBER: u8 = 14;
    /// CPU1 breakpoint hit: channel number
    pub const CPU1_BKPT_HIT_CHANNEL: u8 = 15;
    /// Set when CPU0 is the primary CPU
    pub const CPU0_IS_PRIMARY: u8 = 16;
    /// Set when CPU1 is the primary CPU
    pub const CPU1_IS_PRIMARY: u8 = 17;
}
