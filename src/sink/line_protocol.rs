//! InfluxDB line protocol encoding for [`Point`]s.
//!
//! `measurement,tag=value field=1.5,other=2 1718451015`

use super::Point;

impl Point {
    /// Encode as a single line-protocol record with second precision
    pub fn to_line_protocol(&self) -> String {
        let mut line = String::with_capacity(256);
        line.push_str(&escape(&self.measurement, &[',', ' ']));

        for (key, value) in &self.tags {
            if value.is_empty() {
                // empty tag values are rejected by the write API
                continue;
            }
            line.push(',');
            line.push_str(&escape(key, TAG_SPECIALS));
            line.push('=');
            line.push_str(&escape(value, TAG_SPECIALS));
        }

        for (i, (key, value)) in self.fields.iter().enumerate() {
            line.push(if i == 0 { ' ' } else { ',' });
            line.push_str(&escape(key, TAG_SPECIALS));
            line.push('=');
            line.push_str(&format!("{value:?}"));
        }

        line.push(' ');
        line.push_str(&self.timestamp_secs.to_string());
        line
    }
}

const TAG_SPECIALS: &[char] = &[',', '=', ' '];

fn escape(raw: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Point {
        Point {
            measurement: "power_samples".into(),
            tags: vec![("site".into(), "shu".into()), ("sensor".into(), "sim_pi01".into())],
            fields: vec![("vrms", 230.5), ("irms", 4.0)],
            timestamp_secs: 1_718_451_015,
        }
    }

    #[test]
    fn encodes_tags_fields_and_seconds() {
        assert_eq!(
            point().to_line_protocol(),
            "power_samples,site=shu,sensor=sim_pi01 vrms=230.5,irms=4.0 1718451015"
        );
    }

    #[test]
    fn escapes_special_characters() {
        let mut p = point();
        p.measurement = "power samples".into();
        p.tags = vec![("site".into(), "lab, bay=2".into())];
        assert_eq!(
            p.to_line_protocol(),
            r"power\ samples,site=lab\,\ bay\=2 vrms=230.5,irms=4.0 1718451015"
        );
    }

    #[test]
    fn skips_empty_tags() {
        let mut p = point();
        p.tags[1].1.clear();
        assert!(p.to_line_protocol().starts_with("power_samples,site=shu vrms="));
    }
}
