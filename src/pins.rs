//! GPIO / peripheral pin assignments for the PetFeeder main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// RFID reader
// ---------------------------------------------------------------------------

/// Wiegand DATA0 line — falling edge per transmitted 0-bit.
pub const RFID_DATA0_GPIO: i32 = 0;
/// Wiegand DATA1 line — falling edge per transmitted 1-bit.
pub const RFID_DATA1_GPIO: i32 = 1;

/// UART RX for serial-attached FDX-B reader modules (shares the DATA0 pin;
/// only one reader variant is wired on a given board).
pub const RFID_UART_RX_GPIO: i32 = 0;
/// RFID reader UART baud rate.
pub const RFID_UART_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// Feeder door servo
// ---------------------------------------------------------------------------

/// PWM output to the door servo signal line.
pub const SERVO_GPIO: i32 = 4;
/// Servo PWM frame rate (standard analog servo).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// Pulse width at 0° (microseconds).
pub const SERVO_MIN_PULSE_US: u32 = 500;
/// Pulse width at 180° (microseconds).
pub const SERVO_MAX_PULSE_US: u32 = 2400;

// ---------------------------------------------------------------------------
// Auger stepper (NEMA 17 through an L298N driver)
// ---------------------------------------------------------------------------

/// 4-wire coil outputs, energised in the full-step sequence.
pub const STEPPER_IN1_GPIO: i32 = 8;
pub const STEPPER_IN2_GPIO: i32 = 9;
pub const STEPPER_IN3_GPIO: i32 = 10;
pub const STEPPER_IN4_GPIO: i32 = 11;

/// L298N channel enables (active HIGH).  Both low = driver unpowered,
/// no holding torque at rest.
pub const STEPPER_ENA_GPIO: i32 = 6;
pub const STEPPER_ENB_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// User buttons (active-low momentary switches with pull-ups)
// ---------------------------------------------------------------------------

/// Door override button — door opens while held.
pub const DOOR_BUTTON_GPIO: i32 = 3;
/// Feed button — auger runs while held.
pub const FEED_BUTTON_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Digital output: lit while the feeder door is open.
pub const STATUS_LED_GPIO: i32 = 21;
