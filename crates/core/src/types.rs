//! 도메인 타입 — 지오로케이션 조회 경계
//!
//! IP 위치 조회는 외부 협력자입니다. 포매터는 [`GeoLookup`]을
//! `ip -> Option<GeoInfo>` 순수 함수로만 취급합니다.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// IP 위치 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    /// 도시명 (없을 수 있음)
    pub city: Option<String>,
    /// 국가명
    pub country: String,
    /// ISO 국가 코드
    pub country_code: String,
}

impl fmt::Display for GeoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.city {
            Some(city) if !city.is_empty() => {
                write!(f, "{}, {} ({})", city, self.country, self.country_code)
            }
            _ => write!(f, "{} ({})", self.country, self.country_code),
        }
    }
}

/// IP 위치 조회
pub trait GeoLookup: Send + Sync {
    /// 주소의 위치를 조회합니다. 모르면 `None`.
    fn lookup(&self, ip: &str) -> Option<GeoInfo>;
}

/// 조회 대상이 아닌 주소인지 판별합니다.
///
/// 사설, 루프백, 링크 로컬, 미지정 주소와 파싱 불가한 문자열은 조회하지 않습니다.
pub fn is_non_routable(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        Ok(IpAddr::V6(v6)) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 고유 로컬, fe80::/10 링크 로컬
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
        Err(_) => true,
    }
}
