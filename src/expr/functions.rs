//! Built-in expression functions
//!
//! Functions are resolved by name at compile time. Null arguments
//! propagate to a null result except for `exists` and `geodistance`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use super::errors::{ExprError, ExprResult};
use super::value::Scalar;

/// Mean Earth radius used by geodistance, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_372_797.560856;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Exists,
    Abs,
    Floor,
    Ceil,
    Sqrt,
    Log,
    Lower,
    Upper,
    Strlen,
    StartsWith,
    Contains,
    Substr,
    ParseTime,
    Year,
    Month,
    DayOfMonth,
    GeoDistance,
}

impl Function {
    /// Resolves a function name, case-insensitively
    pub fn lookup(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "exists" => Function::Exists,
            "abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "sqrt" => Function::Sqrt,
            "log" => Function::Log,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            "strlen" => Function::Strlen,
            "startswith" => Function::StartsWith,
            "contains" => Function::Contains,
            "substr" => Function::Substr,
            "parsetime" => Function::ParseTime,
            "year" => Function::Year,
            "month" => Function::Month,
            "dayofmonth" => Function::DayOfMonth,
            "geodistance" => Function::GeoDistance,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Exists => "exists",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Sqrt => "sqrt",
            Function::Log => "log",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Strlen => "strlen",
            Function::StartsWith => "startswith",
            Function::Contains => "contains",
            Function::Substr => "substr",
            Function::ParseTime => "parsetime",
            Function::Year => "year",
            Function::Month => "month",
            Function::DayOfMonth => "dayofmonth",
            Function::GeoDistance => "geodistance",
        }
    }

    pub fn check_arity(&self, got: usize) -> ExprResult<()> {
        let (ok, expected) = match self {
            Function::StartsWith | Function::Contains => (got == 2, "2"),
            Function::Substr => (got == 3, "3"),
            Function::ParseTime => (got == 1 || got == 2, "1 or 2"),
            Function::GeoDistance => (got == 2 || got == 4, "2 or 4"),
            _ => (got == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                function: self.name(),
                expected,
                got,
            })
        }
    }

    /// Applies the function to evaluated arguments
    pub fn call(&self, args: &[Scalar]) -> ExprResult<Scalar> {
        match self {
            Function::Exists => Ok(Scalar::Bool(!args[0].is_null())),
            Function::GeoDistance => geodistance(args),
            _ if args.iter().any(Scalar::is_null) => Ok(Scalar::Null),
            Function::Abs => Ok(self.number(&args[0])?.abs().into()),
            Function::Floor => Ok(self.number(&args[0])?.floor().into()),
            Function::Ceil => Ok(self.number(&args[0])?.ceil().into()),
            Function::Sqrt => {
                let n = self.number(&args[0])?;
                if n < 0.0 {
                    return Err(ExprError::Domain(format!("sqrt of negative number {}", n)));
                }
                Ok(n.sqrt().into())
            }
            Function::Log => {
                let n = self.number(&args[0])?;
                if n <= 0.0 {
                    return Err(ExprError::Domain(format!("log of non-positive number {}", n)));
                }
                Ok(n.ln().into())
            }
            Function::Lower => Ok(args[0].to_string().to_lowercase().into()),
            Function::Upper => Ok(args[0].to_string().to_uppercase().into()),
            Function::Strlen => Ok((args[0].to_string().chars().count() as f64).into()),
            Function::StartsWith => {
                Ok(args[0].to_string().starts_with(&args[1].to_string()).into())
            }
            Function::Contains => Ok(args[0].to_string().contains(&args[1].to_string()).into()),
            Function::Substr => {
                let start = self.number(&args[1])?;
                let len = self.number(&args[2])?;
                Ok(substr(&args[0].to_string(), start, len).into())
            }
            Function::ParseTime => {
                let format = args.get(1).map(|f| f.to_string());
                Ok(parse_time(&args[0].to_string(), format.as_deref())
                    .map_or(Scalar::Null, |secs| Scalar::Number(secs as f64)))
            }
            Function::Year => Ok(self.date(&args[0])?.map_or(Scalar::Null, |d| (d.year() as f64).into())),
            Function::Month => Ok(self.date(&args[0])?.map_or(Scalar::Null, |d| (d.month() as f64).into())),
            Function::DayOfMonth => Ok(self.date(&args[0])?.map_or(Scalar::Null, |d| (d.day() as f64).into())),
        }
    }

    fn number(&self, arg: &Scalar) -> ExprResult<f64> {
        arg.as_number()
            .ok_or_else(|| ExprError::type_error(self.name(), "number", arg.type_name()))
    }

    /// Calendar date of a unix timestamp in seconds, UTC
    fn date(&self, arg: &Scalar) -> ExprResult<Option<NaiveDate>> {
        let secs = self.number(arg)?;
        Ok(DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0).map(|t| t.date_naive()))
    }
}

/// Character-based substring. A negative start counts from the end; a
/// negative length takes everything up to the end.
fn substr(text: &str, start: f64, len: f64) -> String {
    let chars: Vec<char> = text.chars().collect();
    let count = chars.len() as i64;
    let mut from = start.floor() as i64;
    if from < 0 {
        from = count.saturating_add(from).max(0);
    }
    let from = from.min(count) as usize;
    let to = if len < 0.0 {
        chars.len()
    } else {
        from.saturating_add(len.floor() as usize).min(chars.len())
    };
    chars[from..to].iter().collect()
}

/// Parses a timestamp into unix seconds.
///
/// Without a format, accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD`. With a format, uses chrono's strftime syntax.
fn parse_time(text: &str, format: Option<&str>) -> Option<i64> {
    let text = text.trim();
    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(text, format)
            .map(|t| t.and_utc().timestamp())
            .or_else(|_| {
                NaiveDate::parse_from_str(text, format)
                    .map(|d| d.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp()))
            })
            .ok();
    }

    DateTime::parse_from_rfc3339(text)
        .map(|t| t.timestamp())
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|t| t.and_utc().timestamp())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc().timestamp())
        })
}

/// Haversine distance in meters between (lon, lat) pairs.
///
/// Accepts either four numbers or two `"lon,lat"` strings. Any missing
/// coordinate is an error rather than NaN.
fn geodistance(args: &[Scalar]) -> ExprResult<Scalar> {
    let coords: Vec<f64> = if args.len() == 4 {
        args.iter()
            .enumerate()
            .map(|(i, arg)| arg.as_number().ok_or(ExprError::MissingCoordinate(i + 1)))
            .collect::<ExprResult<_>>()?
    } else {
        let mut coords = Vec::with_capacity(4);
        for (i, arg) in args.iter().enumerate() {
            let (lon, lat) = parse_point(arg).ok_or(ExprError::MissingCoordinate(i + 1))?;
            coords.push(lon);
            coords.push(lat);
        }
        coords
    };

    let (lon1, lat1, lon2, lat2) = (coords[0], coords[1], coords[2], coords[3]);
    for (i, (value, limit)) in [(lon1, 180.0), (lat1, 90.0), (lon2, 180.0), (lat2, 90.0)]
        .into_iter()
        .enumerate()
    {
        if value.abs() > limit {
            return Err(ExprError::MissingCoordinate(if args.len() == 4 { i + 1 } else { i / 2 + 1 }));
        }
    }

    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    Ok(Scalar::Number(EARTH_RADIUS_METERS * c))
}

fn parse_point(arg: &Scalar) -> Option<(f64, f64)> {
    match arg {
        Scalar::Text(s) => {
            let (lon, lat) = s.split_once(',')?;
            Some((lon.trim().parse().ok()?, lat.trim().parse().ok()?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: Function, args: &[Scalar]) -> ExprResult<Scalar> {
        function.call(args)
    }

    #[test]
    fn test_substr() {
        assert_eq!(substr("2019-04-02", 0.0, 4.0), "2019");
        assert_eq!(substr("abc", 1.0, 10.0), "bc");
        assert_eq!(substr("abc", 5.0, 1.0), "");
        assert_eq!(substr("abcdef", -2.0, -1.0), "ef");
    }

    #[test]
    fn test_substr_extreme_bounds() {
        assert_eq!(substr("abc", 1.0, 1e20), "bc");
        assert_eq!(substr("abc", 0.0, f64::INFINITY), "abc");
        assert_eq!(substr("abc", -1e20, 2.0), "ab");
        assert_eq!(substr("abc", 1e20, 1e20), "");

        let out = call(Function::Substr, &["abc".into(), 1.0.into(), 1e20.into()]).unwrap();
        assert_eq!(out, Scalar::from("bc"));
    }

    #[test]
    fn test_geodistance_known_pair() {
        // Anchorage to Woodland Park, CO is roughly 3,900 km
        let d = call(
            Function::GeoDistance,
            &[(-149.9).into(), 61.2.into(), (-105.0569).into(), 38.9939.into()],
        )
        .unwrap();
        let Scalar::Number(meters) = d else { panic!("expected number") };
        assert!((3_850_000.0..3_990_000.0).contains(&meters), "{}", meters);

        let zero = call(Function::GeoDistance, &["1,2".into(), "1,2".into()]).unwrap();
        assert_eq!(zero, Scalar::Number(0.0));
    }

    #[test]
    fn test_geodistance_missing_coordinate_fails() {
        let err = call(
            Function::GeoDistance,
            &[Scalar::Null, 61.2.into(), (-105.0).into(), 38.9.into()],
        )
        .unwrap_err();
        assert_eq!(err, ExprError::MissingCoordinate(1));

        let err = call(Function::GeoDistance, &["1,2".into(), "nowhere".into()]).unwrap_err();
        assert_eq!(err, ExprError::MissingCoordinate(2));
    }

    #[test]
    fn test_null_propagates() {
        assert_eq!(call(Function::Ceil, &[Scalar::Null]).unwrap(), Scalar::Null);
        assert_eq!(call(Function::Exists, &[Scalar::Null]).unwrap(), Scalar::Bool(false));
    }

    #[test]
    fn test_time_functions() {
        let secs = call(Function::ParseTime, &["2015-06-03T10:15:00-04:00".into()]).unwrap();
        assert_eq!(secs, Scalar::Number(1_433_340_900.0));
        assert_eq!(call(Function::Year, &[secs.clone()]).unwrap(), Scalar::Number(2015.0));
        assert_eq!(call(Function::Month, &[secs.clone()]).unwrap(), Scalar::Number(6.0));
        assert_eq!(call(Function::DayOfMonth, &[secs]).unwrap(), Scalar::Number(3.0));

        assert_eq!(
            call(Function::ParseTime, &["2020-01-02".into()]).unwrap(),
            Scalar::Number(1_577_923_200.0)
        );
        assert_eq!(call(Function::ParseTime, &["soon".into()]).unwrap(), Scalar::Null);
    }

    #[test]
    fn test_numeric_type_error() {
        let err = call(Function::Ceil, &["abc".into()]).unwrap_err();
        assert!(matches!(err, ExprError::Type { expected: "number", .. }));
        assert!(matches!(call(Function::Sqrt, &[(-1.0).into()]), Err(ExprError::Domain(_))));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(Function::lookup("GeoDistance"), Some(Function::GeoDistance));
        assert_eq!(Function::lookup("nope"), None);
    }
}
