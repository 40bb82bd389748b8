/// A set of sensors polled together and logged as one line per poll
use std::collections::BTreeMap;

use log::{debug, warn};
use time::OffsetDateTime;

use crate::models::{Addressing, Quantity};
use crate::sensors::Sensor;
use crate::utils::{format_datetime, format_value, log_field};

/// Values of one valid reading, keyed by quantity.
pub type Fields = BTreeMap<Quantity, f64>;

/// Sensor name to its fields, or `None` when the read was invalid.
pub type Readings = BTreeMap<String, Option<Fields>>;

#[derive(Default)]
pub struct SensorMonitor {
    sensors: Vec<Box<dyn Sensor>>,
    log_fields: Vec<String>,
}

impl SensorMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sensor unless one with the same name is already loaded.
    ///
    /// Returns whether the sensor was added.
    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) -> bool {
        let name = sensor.name().to_string();
        if self.sensors.iter().any(|s| s.name() == name) {
            warn!("Sensor {} already added, ignoring", name);
            return false;
        }

        for &quantity in sensor.fields() {
            self.log_fields.push(log_field(&name, quantity));
        }
        debug!("Added {} on {}", name, sensor.options());
        self.sensors.push(sensor);
        true
    }

    pub fn remove_sensor(&mut self, name: &str) -> Option<Box<dyn Sensor>> {
        let index = self.sensors.iter().position(|s| s.name() == name)?;
        let sensor = self.sensors.remove(index);

        let columns: Vec<String> = sensor
            .fields()
            .iter()
            .map(|&quantity| log_field(name, quantity))
            .collect();
        self.log_fields.retain(|field| !columns.contains(field));
        Some(sensor)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(|s| s.name())
    }

    /// Type name and wiring of every loaded sensor.
    pub fn sensor_options(&self) -> Vec<(&'static str, Addressing)> {
        self.sensors
            .iter()
            .map(|s| (s.type_name(), s.options()))
            .collect()
    }

    /// Column names, sensor by sensor in the order they were added.
    pub fn log_fields(&self) -> &[String] {
        &self.log_fields
    }

    pub fn header(&self) -> String {
        let mut header = String::from("date time");
        for field in &self.log_fields {
            header.push(' ');
            header.push_str(field);
        }
        header
    }

    /// Read every sensor once.
    pub fn get_readings(&mut self) -> Readings {
        let mut readings = Readings::new();
        for sensor in self.sensors.iter_mut() {
            let fields = sensor.fields();
            let measurement = sensor.read();
            let values = measurement.is_valid.then(|| {
                fields
                    .iter()
                    .filter_map(|&q| measurement.get(q).map(|v| (q, v)))
                    .collect()
            });
            readings.insert(measurement.sensor_name, values);
        }
        readings
    }

    /// Timestamp followed by one column per log field.
    ///
    /// Missing or invalid values leave their column empty, so the column
    /// count always matches [`SensorMonitor::header`].
    pub fn readings_line(&self, timestamp: &OffsetDateTime, readings: &Readings) -> String {
        let mut values = BTreeMap::new();
        for (sensor_name, fields) in readings {
            let Some(fields) = fields else { continue };
            for (&quantity, &value) in fields {
                values.insert(log_field(sensor_name, quantity), value);
            }
        }

        let mut line = format_datetime(timestamp);
        for field in &self.log_fields {
            line.push(' ');
            line.push_str(&format_value(values.get(field).copied()));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use time::macros::datetime;

    /// Replays scripted results, one per read.
    struct ScriptedSensor {
        name: String,
        fields: &'static [Quantity],
        results: Vec<Result<Vec<(Quantity, f64)>, ReadError>>,
    }

    impl ScriptedSensor {
        fn boxed(
            name: &str,
            fields: &'static [Quantity],
            results: Vec<Result<Vec<(Quantity, f64)>, ReadError>>,
        ) -> Box<dyn Sensor> {
            Box::new(ScriptedSensor {
                name: name.to_string(),
                fields,
                results,
            })
        }
    }

    impl Sensor for ScriptedSensor {
        fn name(&self) -> &str {
            &self.name
        }

        fn type_name(&self) -> &'static str {
            "SCRIPTED"
        }

        fn fields(&self) -> &'static [Quantity] {
            self.fields
        }

        fn options(&self) -> Addressing {
            Addressing::Pin(0)
        }

        fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError> {
            if self.results.is_empty() {
                return Err(ReadError::Quiescence);
            }
            self.results.remove(0)
        }
    }

    const TH: &[Quantity] = &[Quantity::Temperature, Quantity::Humidity];
    const THP: &[Quantity] = &[Quantity::Temperature, Quantity::Humidity, Quantity::Pressure];

    fn monitor() -> SensorMonitor {
        let mut monitor = SensorMonitor::new();
        monitor.add_sensor(ScriptedSensor::boxed(
            "DHT11_PIN4",
            TH,
            vec![Ok(vec![(Quantity::Temperature, 22.0), (Quantity::Humidity, 55.0)])],
        ));
        monitor.add_sensor(ScriptedSensor::boxed(
            "BME280_i2c-1_0x76",
            THP,
            vec![Err(ReadError::AckMissing)],
        ));
        monitor
    }

    #[test]
    fn header_lists_sensor_fields_in_order() {
        assert_eq!(
            monitor().header(),
            "date time DHT11_PIN4_temp DHT11_PIN4_hum \
             BME280_i2c-1_0x76_temp BME280_i2c-1_0x76_hum BME280_i2c-1_0x76_pres"
        );
    }

    #[test]
    fn duplicate_names_are_ignored() {
        let mut monitor = monitor();

        let added = monitor.add_sensor(ScriptedSensor::boxed("DHT11_PIN4", TH, Vec::new()));

        assert!(!added);
        assert_eq!(monitor.len(), 2);
        assert_eq!(monitor.log_fields().len(), 5);
    }

    #[test]
    fn removing_drops_columns() {
        let mut monitor = monitor();

        let removed = monitor.remove_sensor("DHT11_PIN4");

        assert_eq!(removed.map(|s| s.name().to_string()), Some("DHT11_PIN4".into()));
        assert_eq!(
            monitor.header(),
            "date time BME280_i2c-1_0x76_temp BME280_i2c-1_0x76_hum BME280_i2c-1_0x76_pres"
        );
        assert!(monitor.remove_sensor("DHT11_PIN4").is_none());
    }

    #[test]
    fn invalid_reads_map_to_none() {
        let mut monitor = monitor();

        let readings = monitor.get_readings();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings["BME280_i2c-1_0x76"], None);
        let dht = readings["DHT11_PIN4"].as_ref().unwrap();
        assert_eq!(dht[&Quantity::Temperature], 22.0);
        assert_eq!(dht[&Quantity::Humidity], 55.0);
    }

    #[test]
    fn readings_line_leaves_missing_columns_empty() {
        let mut monitor = monitor();
        let readings = monitor.get_readings();

        let line = monitor.readings_line(&datetime!(2024-03-09 07:05:02 UTC), &readings);

        assert_eq!(line, "2024-03-09 07:05:02 22.00 55.00   ");
        assert_eq!(line.split(' ').count(), monitor.header().split(' ').count());
    }

    #[test]
    fn reports_sensor_options() {
        assert_eq!(
            monitor().sensor_options(),
            vec![("SCRIPTED", Addressing::Pin(0)), ("SCRIPTED", Addressing::Pin(0))]
        );
    }
}
