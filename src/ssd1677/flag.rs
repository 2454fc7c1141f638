/// Parameter bytes sent after the commands in [`Cmd`](super::cmd::Cmd).
///
/// Values are those of the 800x480 SSD1677 panels; the controller's POR
/// defaults are not usable on this glass.
pub struct Flag;
#[allow(missing_docs)]
impl Flag {
    // Temperature Sensor Control (0x18)
    pub const INTERNAL_TEMP_SENSOR: u8 = 0x80;
    pub const EXTERNAL_TEMP_SENSOR: u8 = 0x48;

    // Booster Soft Start Control (0x0C): phase 1..3 drive strength, duration
    pub const BOOSTER_SOFT_START: [u8; 5] = [0xAE, 0xC7, 0xC3, 0xC0, 0x80];

    // Driver Output Control (0x01) third byte: SM=1 interlaced gate scan
    pub const DRIVER_OUTPUT_SCAN: u8 = 0x02;

    // Border Waveform Control (0x3C)
    pub const BORDER_WAVEFORM_BLACK: u8 = 0x00;
    pub const BORDER_WAVEFORM_WHITE: u8 = 0x01;

    // Data Entry Mode (0x11)
    pub const DATA_ENTRY_DECRY_DECRX: u8 = 0x00; // Y decrement, X decrement
    pub const DATA_ENTRY_DECRY_INCRX: u8 = 0x01; // Y decrement, X increment
    pub const DATA_ENTRY_INCRY_DECRX: u8 = 0x02; // Y increment, X decrement
    pub const DATA_ENTRY_INCRY_INCRX: u8 = 0x03; // Y increment, X increment

    // Display Update Control 2 (0x22)
    pub const DISPLAY_UPDATE_FULL: u8 = 0xF7; // clock+analog on, load temp+LUT, mode 1, off
    pub const DISPLAY_UPDATE_FAST: u8 = 0xC7; // clock+analog on, mode 1 with loaded LUT, off

    // Deep Sleep Mode (0x10)
    pub const DEEP_SLEEP_NORMAL_MODE: u8 = 0x00;
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01; // RAM retained

    // RAM fill bytes (1 = white, 0 = black)
    pub const RAM_ALL_WHITE: u8 = 0xFF;
    pub const RAM_ALL_BLACK: u8 = 0x00;
}
