//! wl12xx testmode request encoding and answer decoding
//!
//! Requests are attribute streams that end up inside
//! `NL80211_ATTR_TESTDATA`; answers are the `TESTDATA` of the driver reply,
//! whose `TM_ATTR_DATA` holds the raw firmware answer.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use wl_chip::testmode::{
    attr, cmd, test, wl18xx, FW_CMD_TEST, FW_HEADER_LEN, FW_STATUS_SUCCESS, FW_VERSION_STR_LEN,
    P2G_ANSWER_HEADER_LEN, RX_STATS_LEN, TEST_HEADER_LEN, TEST_PARAMS_OFFSET,
};

use crate::error::{CalError, Result};
use crate::netlink::codec::{find_attr, parse_attrs, AttrWriter};

/// `SET_PLT_MODE` request
pub fn plt_mode(mode: u32) -> Bytes {
    let mut w = AttrWriter::new();
    w.put_u32(attr::CMD_ID, cmd::SET_PLT_MODE).put_u32(attr::PLT_MODE, mode);
    w.into_bytes()
}

/// `GET_MAC` request
pub fn get_mac() -> Bytes {
    let mut w = AttrWriter::new();
    w.put_u32(attr::CMD_ID, cmd::GET_MAC);
    w.into_bytes()
}

/// `CMD_TEST` request wrapping firmware test `test_id`
pub fn fw_test(test_id: u8, params: &[u8], answer: bool) -> Bytes {
    let mut data = BytesMut::with_capacity(TEST_PARAMS_OFFSET + params.len());
    data.put_u16_le(FW_CMD_TEST);
    data.put_u16_le(0);
    data.put_u8(test_id);
    data.put_bytes(0, TEST_HEADER_LEN - 1);
    data.put_slice(params);

    let mut w = AttrWriter::new();
    w.put_u32(attr::CMD_ID, cmd::TEST).put_bytes(attr::DATA, &data);
    if answer {
        w.put_u8(attr::ANSWER, 1);
    }
    w.into_bytes()
}

/// Firmware answer to a test command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FwAnswer {
    /// Firmware status word
    pub status: u16,
    /// Test id echoed by the firmware
    pub test_id: u8,
    /// Test-specific result bytes
    pub params: Vec<u8>,
}

/// Extract `TM_ATTR_DATA` from a reply's `TESTDATA`
///
/// # Errors
///
/// Returns error if the reply is malformed or carries no data.
pub fn answer_data(testdata: &[u8]) -> Result<Vec<u8>> {
    let attrs = parse_attrs(testdata)?;
    find_attr(&attrs, attr::DATA)
        .map(|a| a.value.to_vec())
        .ok_or_else(|| CalError::netlink("reply carries no TM_ATTR_DATA"))
}

/// Decode the firmware answer to test `expected`, checking its status
///
/// # Errors
///
/// Returns `CalError::Firmware` on a failure status and
/// `CalError::Netlink` on a truncated answer.
pub fn parse_fw_answer(data: &[u8], expected: u8) -> Result<FwAnswer> {
    if data.len() < TEST_PARAMS_OFFSET {
        return Err(CalError::netlink(format!(
            "firmware answer truncated ({} bytes)",
            data.len()
        )));
    }

    let mut hdr = &data[..TEST_PARAMS_OFFSET];
    let _id = hdr.get_u16_le();
    let status = hdr.get_u16_le();
    let test_id = hdr.get_u8();

    if status != FW_STATUS_SUCCESS {
        return Err(CalError::Firmware {
            test_id: expected,
            status,
        });
    }
    if test_id != expected {
        tracing::warn!("Firmware answered test 0x{test_id:02x}, expected 0x{expected:02x}");
    }

    Ok(FwAnswer {
        status,
        test_id,
        params: data[TEST_PARAMS_OFFSET..].to_vec(),
    })
}

/// Encode a driver reply `TESTDATA` for a firmware test answer
pub fn encode_fw_answer(status: u16, test_id: u8, params: &[u8]) -> Vec<u8> {
    let mut data = BytesMut::with_capacity(TEST_PARAMS_OFFSET + params.len());
    data.put_u16_le(FW_CMD_TEST);
    data.put_u16_le(status);
    data.put_u8(test_id);
    data.put_bytes(0, TEST_HEADER_LEN - 1);
    data.put_slice(params);
    encode_data_answer(&data)
}

/// Encode a driver reply `TESTDATA` holding raw `data`
pub fn encode_data_answer(data: &[u8]) -> Vec<u8> {
    let mut w = AttrWriter::new();
    w.put_bytes(attr::DATA, data);
    w.as_bytes().to_vec()
}

/// Reply a healthy chip would give to `testdata`, for dry runs
///
/// Requests that expect an answer get a successful one of the right size
/// with zeroed contents. Everything else is acknowledged without data
/// (`None`).
pub fn dry_run_answer(testdata: &[u8]) -> Option<Vec<u8>> {
    let attrs = parse_attrs(testdata).ok()?;
    let cmd_id = find_attr(&attrs, attr::CMD_ID).and_then(|a| a.as_u32().ok());
    match cmd_id {
        Some(cmd::GET_MAC) => Some(encode_data_answer(&[0; 6])),
        Some(cmd::TEST) => {
            find_attr(&attrs, attr::ANSWER)?;
            let data = find_attr(&attrs, attr::DATA)?.value;
            let test_id = *data.get(FW_HEADER_LEN)?;
            let params = vec![0; answer_len(test_id)];
            Some(encode_fw_answer(FW_STATUS_SUCCESS, test_id, &params))
        }
        _ => None,
    }
}

/// Size of the parameter block the firmware returns for `test_id`
fn answer_len(test_id: u8) -> usize {
    match test_id {
        test::P2G_CAL => P2G_ANSWER_HEADER_LEN,
        test::RX_STAT_GET | wl18xx::GET_RX_STATS => RX_STATS_LEN,
        test::GET_FW_VERSIONS => FW_VERSION_STR_LEN + 4,
        _ => 0,
    }
}

/// One-line description of a request, for logs and dry runs
pub fn describe(testdata: &[u8]) -> String {
    let Ok(attrs) = parse_attrs(testdata) else {
        return format!("<malformed {} bytes>", testdata.len());
    };

    let cmd_id = find_attr(&attrs, attr::CMD_ID).and_then(|a| a.as_u32().ok());
    match cmd_id {
        Some(cmd::SET_PLT_MODE) => {
            let mode = find_attr(&attrs, attr::PLT_MODE).and_then(|a| a.as_u32().ok());
            format!("SET_PLT_MODE mode={}", mode.unwrap_or_default())
        }
        Some(cmd::GET_MAC) => "GET_MAC".to_string(),
        Some(cmd::TEST) => {
            let data = find_attr(&attrs, attr::DATA).map(|a| a.value).unwrap_or_default();
            let test_id = data.get(FW_HEADER_LEN).copied().unwrap_or_default();
            let params = data.get(TEST_PARAMS_OFFSET..).unwrap_or_default();
            format!("TEST 0x{test_id:02x} params={params:02x?}")
        }
        Some(other) => format!("testmode cmd {other}"),
        None => "testmode <no cmd id>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plt_mode_request() {
        let req = plt_mode(1);
        let attrs = parse_attrs(&req).unwrap();
        let cmd_id = find_attr(&attrs, attr::CMD_ID).unwrap();
        assert_eq!(cmd_id.as_u32().unwrap(), cmd::SET_PLT_MODE);
        let mode = find_attr(&attrs, attr::PLT_MODE).unwrap();
        assert_eq!(mode.as_u32().unwrap(), 1);
    }

    #[test]
    fn fw_test_layout() {
        let req = fw_test(test::CHANNEL_TUNE, &[0, 7, 0, 0], false);
        let attrs = parse_attrs(&req).unwrap();
        let data = find_attr(&attrs, attr::DATA).unwrap().value;
        assert_eq!(&data[..2], &FW_CMD_TEST.to_le_bytes());
        assert_eq!(data[FW_HEADER_LEN], test::CHANNEL_TUNE);
        assert_eq!(&data[TEST_PARAMS_OFFSET..], &[0, 7, 0, 0]);
        assert!(find_attr(&attrs, attr::ANSWER).is_none());

        let req = fw_test(test::RX_STAT_GET, &[], true);
        let attrs = parse_attrs(&req).unwrap();
        assert_eq!(find_attr(&attrs, attr::ANSWER).unwrap().as_u8().unwrap(), 1);
    }

    #[test]
    fn answer_decodes_and_checks_status() {
        let reply = encode_fw_answer(FW_STATUS_SUCCESS, test::P2G_CAL, &[1, 2, 3]);
        let data = answer_data(&reply).unwrap();
        let answer = parse_fw_answer(&data, test::P2G_CAL).unwrap();
        assert_eq!(answer.params, vec![1, 2, 3]);

        let reply = encode_fw_answer(0x0f, test::P2G_CAL, &[]);
        let data = answer_data(&reply).unwrap();
        assert!(matches!(
            parse_fw_answer(&data, test::P2G_CAL),
            Err(CalError::Firmware { status: 0x0f, .. })
        ));
    }

    #[test]
    fn truncated_answer_rejected() {
        assert!(parse_fw_answer(&[1, 0, 1], test::P2G_CAL).is_err());
        assert!(answer_data(&[]).is_err());
    }

    #[test]
    fn dry_run_answers_match_requests() {
        let p2g = fw_test(test::P2G_CAL, &[1, 0, 0, 0], true);
        let data = answer_data(&dry_run_answer(&p2g).unwrap()).unwrap();
        let answer = parse_fw_answer(&data, test::P2G_CAL).unwrap();
        assert_eq!(answer.status, FW_STATUS_SUCCESS);
        assert_eq!(answer.params, vec![0; P2G_ANSWER_HEADER_LEN]);

        let stats = fw_test(wl18xx::GET_RX_STATS, &[], true);
        let data = answer_data(&dry_run_answer(&stats).unwrap()).unwrap();
        let answer = parse_fw_answer(&data, wl18xx::GET_RX_STATS).unwrap();
        assert_eq!(answer.params.len(), RX_STATS_LEN);

        let mac = answer_data(&dry_run_answer(&get_mac()).unwrap()).unwrap();
        assert_eq!(mac, vec![0; 6]);

        let tune = fw_test(test::CHANNEL_TUNE, &[0, 7, 0, 0], false);
        assert_eq!(dry_run_answer(&tune), None);
        assert_eq!(dry_run_answer(&plt_mode(1)), None);
        assert_eq!(dry_run_answer(&[1, 2]), None);
    }

    #[test]
    fn descriptions() {
        assert_eq!(describe(&plt_mode(0)), "SET_PLT_MODE mode=0");
        assert_eq!(describe(&get_mac()), "GET_MAC");
        assert!(describe(&fw_test(test::STOP_TX, &[], false)).starts_with("TEST 0x09"));
    }
}
