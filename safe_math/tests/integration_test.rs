use safe_math::{frequency_to_period, period_to_frequency, Overflow, PICOSECONDS_PER_SECOND};

#[test]
pub fn period_frequency_test() {
	// 16 kHz and 4 Hz, the bounds of the virtual controller
	assert_eq!(period_to_frequency(62_500_000), Ok(16_000));
	assert_eq!(period_to_frequency(250_000_000_000), Ok(4));
	assert_eq!(frequency_to_period(16_000), Ok(62_500_000));
	assert_eq!(frequency_to_period(4), Ok(250_000_000_000));

	assert_eq!(period_to_frequency(PICOSECONDS_PER_SECOND), Ok(1));
	assert_eq!(period_to_frequency(0), Err(Overflow));
	assert_eq!(frequency_to_period(0), Err(Overflow));
}

#[test]
pub fn period_frequency_rounding_test() {
	// 3 Hz is 333_333_333_333.33 ps, which rounds down
	let period = frequency_to_period(3).unwrap();
	assert_eq!(period, 333_333_333_333);
	assert_eq!(period_to_frequency(period), Ok(3));

	// 7 kHz does not survive the round trip exactly in picoseconds, only up to rounding
	let period = frequency_to_period(7_000).unwrap();
	assert_eq!(period, 142_857_143);
	assert_eq!(period_to_frequency(period), Ok(7_000));

	assert_eq!(period_to_frequency(700_000_000_000), Ok(1));
	// 2.5 Hz
	assert_eq!(period_to_frequency(400_000_000_000), Ok(3));
}
