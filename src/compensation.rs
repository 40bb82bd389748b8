/// BME280 calibration data and compensation formulas
///
/// The formulas are the floating-point variants from the Bosch datasheet.
/// Every step is kept in the datasheet's order so results match reference
/// outputs bit for bit in `f64`.
use log::debug;

/// Factory calibration read from the sensor's NVM.
///
/// Values are widened to `i32` so the unsigned (`dig_T1`, `dig_P1`,
/// `dig_H1`, `dig_H3`) and signed coefficients share one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    pub temperature: [i32; 3],
    pub pressure: [i32; 9],
    pub humidity: [i32; 6],
}

/// Intermediate produced by temperature compensation.
///
/// Pressure and humidity compensation take this as input, so they cannot
/// be run before the temperature of the same sample has been compensated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FineTemperature(f64);

impl FineTemperature {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Calibration {
    /// Decode the three calibration register blocks.
    ///
    /// * `tp` - registers 0x88..=0x9F (temperature and pressure words, little endian)
    /// * `h1` - register 0xA1
    /// * `h` - registers 0xE1..=0xE7 (humidity, including two 12-bit packed values)
    pub fn from_registers(tp: &[u8; 24], h1: u8, h: &[u8; 7]) -> Self {
        let unsigned = |i: usize| i32::from(u16::from_le_bytes([tp[i], tp[i + 1]]));
        let signed = |i: usize| i32::from(i16::from_le_bytes([tp[i], tp[i + 1]]));

        let temperature = [unsigned(0), signed(2), signed(4)];

        let mut pressure = [0i32; 9];
        pressure[0] = unsigned(6);
        for (n, value) in pressure.iter_mut().enumerate().skip(1) {
            *value = signed(6 + 2 * n);
        }

        // dig_H4 and dig_H5 are 12 bits wide: a signed high byte plus one
        // nibble each of the shared register 0xE5.
        let humidity = [
            i32::from(h1),
            i32::from(i16::from_le_bytes([h[0], h[1]])),
            i32::from(h[2]),
            (i32::from(h[3] as i8) << 4) | i32::from(h[4] & 0x0F),
            (i32::from(h[5] as i8) << 4) | i32::from(h[4] >> 4),
            i32::from(h[6] as i8),
        ];

        Calibration {
            temperature,
            pressure,
            humidity,
        }
    }

    /// Temperature in °C and the fine temperature for the other channels.
    pub fn compensate_temperature(&self, adc_t: u32) -> (f64, FineTemperature) {
        let adc = f64::from(adc_t);
        let [t1, t2, t3] = self.temperature.map(f64::from);

        let v1 = (adc / 16384.0 - t1 / 1024.0) * t2;
        let v2 = (adc / 131072.0 - t1 / 8192.0) * (adc / 131072.0 - t1 / 8192.0) * t3;
        let t_fine = v1 + v2;

        (t_fine / 5120.0, FineTemperature(t_fine))
    }

    /// Pressure in hPa.
    ///
    /// Returns exactly 0.0 when the scaling denominator comes out as zero,
    /// which happens with blank calibration data.
    pub fn compensate_pressure(&self, adc_p: u32, fine: FineTemperature) -> f64 {
        let adc = f64::from(adc_p);
        let p = self.pressure.map(f64::from);

        let mut v1 = (fine.0 / 2.0) - 64000.0;
        let mut v2 = (((v1 / 4.0) * (v1 / 4.0)) / 2048.0) * p[5];
        v2 += (v1 * p[4]) * 2.0;
        v2 = (v2 / 4.0) + (p[3] * 65536.0);
        v1 = (((p[2] * (((v1 / 4.0) * (v1 / 4.0)) / 8192.0)) / 8.0) + ((p[1] * v1) / 2.0))
            / 262144.0;
        v1 = ((32768.0 + v1) * p[0]) / 32768.0;

        if v1 == 0.0 {
            debug!("Pressure compensation denominator is zero");
            return 0.0;
        }

        let mut pressure = ((1048576.0 - adc) - (v2 / 4096.0)) * 3125.0;
        if pressure < 2147483648.0 {
            pressure = (pressure * 2.0) / v1;
        } else {
            pressure = (pressure / v1) * 2.0;
        }

        v1 = (p[8] * (((pressure / 8.0) * (pressure / 8.0)) / 8192.0)) / 4096.0;
        v2 = ((pressure / 4.0) * p[7]) / 8192.0;
        pressure += (v1 + v2 + p[6]) / 16.0;

        pressure / 100.0
    }

    /// Relative humidity in %, clamped to 0..=100.
    pub fn compensate_humidity(&self, adc_h: u32, fine: FineTemperature) -> f64 {
        let adc = f64::from(adc_h);
        let h = self.humidity.map(f64::from);

        let mut var_h = fine.0 - 76800.0;
        if var_h == 0.0 {
            return 0.0;
        }

        var_h = (adc - (h[3] * 64.0 + h[4] / 16384.0 * var_h))
            * (h[1] / 65536.0
                * (1.0 + h[5] / 67108864.0 * var_h * (1.0 + h[2] / 67108864.0 * var_h)));
        var_h *= 1.0 - h[0] * var_h / 524288.0;

        var_h.clamp(0.0, 100.0)
    }
}
