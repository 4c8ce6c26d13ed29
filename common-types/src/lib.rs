#[allow(non_snake_case)]
pub mod Contact {
    use ::std::fmt;
    use serde::{Deserialize, Serialize};
    use derive_builder::Builder;

    // Body of POST /contact. Every field is optional on the wire so the relay
    // can tell a missing field apart from a malformed body.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
    #[serde(rename_all = "camelCase")]
    pub struct ContactPayload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub latitude: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub longitude: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub location_type: Option<LocationType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[builder(setter(into, strip_option), default)]
        pub location_error: Option<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LocationType {
        Gps,
        Ip,
        #[serde(other)]
        Unknown,
    }

    impl fmt::Display for LocationType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                LocationType::Gps => write!(f, "gps"),
                LocationType::Ip => write!(f, "ip"),
                LocationType::Unknown => write!(f, "unknown"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RelaySuccess {
        pub success: bool,
        pub message: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RelayFailure {
        pub error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub details: Option<String>,
    }

    // What a client reads back from the relay
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    #[serde(untagged)]
    pub enum RelayReply {
        Success(RelaySuccess),
        Failure(RelayFailure),
    }

}

#[allow(non_snake_case)]
pub mod Ip {
    // Attempt to fetch 'CF-Connecting-IP'
    // Attempt to fetch left-most 'X-Forwarded-For'
    // Attempt to fetch 'X-Real-IP'
    // Attempt to fetch 'Fly-Client-IP'
    // Attempt to fetch 'True-Client-IP'
    //
    // IF DEVELOPMENT
    // Attempt all of above
    // Attempt to fetch 'Host'

    use ::std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use axum::http::HeaderMap;

    const HEADERS: [&'static str; 6] = [
        "cf-connecting-ip",
        "x-forwarded-for",
        "x-real-ip",
        "fly-client-ip",
        "true-client-ip",
        "host",
    ];

    fn try_convert_ip(data: &str) -> Option<IpAddr> {
        let data = data.trim();
        if let Ok(ip) = data.parse::<IpAddr>() {
            return Some(ip)
        }
        // "1.2.3.4:8080"
        if let Some((ip_str, _)) = data.split_once(':') {
            if let Ok(ipv4) = ip_str.parse::<Ipv4Addr>() {
                return Some(IpAddr::V4(ipv4));
            }
        }
        None
    }

    pub fn try_fetch_client_ip(headers: &HeaderMap, development_mode: bool) -> Option<IpAddr> {
        let iterate_up_to = if development_mode { HEADERS.len() } else { HEADERS.len() - 1 };
        for header_name in &HEADERS[..iterate_up_to] {
            let Some(header_value) = headers.get(*header_name) else {
                continue
            };
            if *header_name == "x-forwarded-for" {
                if let Ok(str_header_value) = header_value.to_str() {
                    if let Some(left_most_ip) = str_header_value.split(',').next() {
                        if let Some(ip) = try_convert_ip(left_most_ip) {
                            return Some(ip)
                        }
                    }
                }
                continue
            }
            // https://superuser.com/questions/381022/how-many-characters-can-an-ip-address-be
            if header_value.len() > 62 {
                continue
            }
            if let Ok(str_header_value) = header_value.to_str() {
                if let Some(ip) = try_convert_ip(str_header_value) {
                    return Some(ip)
                }
            }
        }
        if development_mode {
            return Some(IpAddr::V6(Ipv6Addr::LOCALHOST))
        }
        None
    }

}
