//! wl12xx production line test commands (`plt` section)

use std::path::PathBuf;

use bytes::{Buf, BufMut, BytesMut};
use wl_chip::band::Band;
use wl_chip::testmode::{
    plt_mode, test, FW_VERSION_STR_LEN, P2G_ANSWER_HEADER_LEN, RX_STATS_LEN, TX_BIP_SUB_BANDS,
};

use crate::args::{expect_exact, expect_range, parse_flag, parse_mac, parse_num, parse_signed};
use crate::commands::Context;
use crate::error::{CalError, Result};
use crate::mac::MacAddr;
use crate::testmode;

/// `plt power_mode <on|off|fem_detect>`
pub(crate) fn power_mode(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 1)?;
    let mode = match args[0] {
        "on" => plt_mode::ON,
        "off" => plt_mode::OFF,
        "fem_detect" => plt_mode::FEM_DETECT,
        other => return Err(CalError::usage(format!("Invalid power mode: {other}"))),
    };

    ctx.testmode(&testmode::plt_mode(mode))?;
    tracing::info!("PLT power mode {} on {}", args[0], ctx.target.name());
    Ok(())
}

/// `plt tune_channel <band> <channel>`
pub(crate) fn tune_channel(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 2)?;
    let raw_band: u8 = parse_num(args[0], "band")?;
    let band = Band::from_raw(raw_band)
        .ok_or_else(|| CalError::usage(format!("Invalid band: {raw_band} (0 or 1)")))?;
    let channel: u8 = parse_num(args[1], "channel")?;
    if !band.valid_channel(channel) {
        return Err(CalError::usage(format!(
            "Channel {channel} is not valid on band {raw_band}"
        )));
    }

    ctx.fw_test(test::CHANNEL_TUNE, &[band.raw(), channel, 0, 0])
}

/// `plt ref_point <voltage> <power> <subband>`
pub(crate) fn ref_point(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 3)?;
    let voltage: u32 = parse_num(args[0], "voltage")?;
    let power: i32 = parse_signed(args[1], "power")?;
    let sub_band: u8 = parse_num(args[2], "sub-band")?;
    if usize::from(sub_band) >= TX_BIP_SUB_BANDS {
        return Err(CalError::usage(format!(
            "Sub-band must be below {TX_BIP_SUB_BANDS}, got {sub_band}"
        )));
    }

    let mut params = BytesMut::with_capacity(12);
    params.put_i32_le(power);
    params.put_u32_le(voltage);
    params.put_u8(sub_band);
    params.put_bytes(0, 3);

    ctx.fw_test(test::UPDATE_PD_REFERENCE_POINT, &params)
}

/// `plt tx_bip <8 x 0|1> [nvs file]`
///
/// Runs P2G calibration on the flagged sub-bands and stores the results in
/// a copy of the current NVS.
pub(crate) fn tx_bip(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, TX_BIP_SUB_BANDS, TX_BIP_SUB_BANDS + 1)?;

    let mut mask = 0u8;
    for (i, arg) in args[..TX_BIP_SUB_BANDS].iter().enumerate() {
        if parse_flag(arg, "sub-band flag")? {
            mask |= 1 << i;
        }
    }
    if mask == 0 {
        return Err(CalError::usage("At least one sub-band must be selected"));
    }
    let output = args
        .get(TX_BIP_SUB_BANDS)
        .map_or_else(|| ctx.config.new_nvs_path.clone(), PathBuf::from);

    // Check the input before the radio does any work
    let input = ctx.config.nvs_path.clone();
    let mut nvs = ctx.load_nvs(&input)?;

    let answer = ctx.fw_query(test::P2G_CAL, &[mask, 0, 0, 0])?;
    let results = p2g_results(&answer.params)?;
    tracing::debug!("TX-BIP mask 0x{mask:02x}: {} result bytes", results.len());

    nvs.set_tx_bip(results)?;
    ctx.save_nvs(&nvs, &output)?;
    writeln!(
        ctx.out,
        "Calibration results written to {}",
        output.display()
    )?;
    Ok(())
}

fn p2g_results(params: &[u8]) -> Result<&[u8]> {
    let mut header = params
        .get(..P2G_ANSWER_HEADER_LEN)
        .ok_or_else(|| CalError::netlink("P2G answer truncated"))?;
    let len = usize::from(header.get_u16_le());
    params
        .get(P2G_ANSWER_HEADER_LEN..P2G_ANSWER_HEADER_LEN + len)
        .ok_or_else(|| {
            CalError::netlink(format!(
                "P2G answer claims {len} result bytes, carries {}",
                params.len().saturating_sub(P2G_ANSWER_HEADER_LEN)
            ))
        })
}

/// `plt tx_cont <delay> <rate> <size> <amount> <power> <seed> <pkt mode>
/// <dcf> <gi> <type> <mode> <src mac> <dst mac>`
pub(crate) fn tx_cont(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 13)?;

    let mut params = BytesMut::with_capacity(36);
    params.put_u32_le(parse_num(args[0], "delay")?);
    params.put_u32_le(parse_num(args[1], "rate")?);
    params.put_u16_le(parse_num(args[2], "size")?);
    params.put_u16_le(parse_num(args[3], "amount")?);
    params.put_i32_le(parse_signed(args[4], "power")?);
    params.put_u16_le(parse_num(args[5], "seed")?);
    params.put_u8(parse_num(args[6], "packet mode")?);
    params.put_u8(parse_num(args[7], "dcf")?);
    params.put_u8(parse_num(args[8], "guard interval")?);
    params.put_u8(parse_num(args[9], "packet type")?);
    params.put_u8(parse_num(args[10], "mode")?);
    params.put_u8(0);
    params.put_slice(&parse_mac(args[11])?.octets());
    params.put_slice(&parse_mac(args[12])?.octets());

    ctx.fw_test(test::FCC, &params)
}

/// `plt tx_tone <mode> <power>`
pub(crate) fn tx_tone(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 2)?;
    let mode: u8 = parse_num(args[0], "tone mode")?;
    let power: u8 = parse_num(args[1], "power")?;
    ctx.fw_test(test::TELEC, &[mode, power, 0, 0])
}

/// `plt tx_stop`
pub(crate) fn tx_stop(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::STOP_TX, &[])
}

/// `plt start_rx_statcs`
pub(crate) fn start_rx_statcs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::RX_STAT_START, &[])
}

/// `plt stop_rx_statcs`
pub(crate) fn stop_rx_statcs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::RX_STAT_STOP, &[])
}

/// `plt reset_rx_statcs`
pub(crate) fn reset_rx_statcs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::RX_STAT_RESET, &[])
}

/// RX statistics counters, in firmware order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxStats {
    /// Every frame the receiver saw
    pub total: u32,
    /// Frames with FCS errors
    pub fcs_errors: u32,
    /// Frames addressed elsewhere
    pub address_mismatch: u32,
    /// Frames received correctly
    pub good: u32,
    /// Average SNR
    pub avg_snr: u32,
    /// Average RSSI
    pub avg_rssi: u32,
    /// Sequence id of the first counted frame
    pub base_packet_id: u32,
}

impl RxStats {
    /// Decode the statistics block
    ///
    /// # Errors
    ///
    /// Returns `CalError::Netlink` if the block is short.
    pub fn parse(mut data: &[u8]) -> Result<Self> {
        if data.len() < RX_STATS_LEN {
            return Err(CalError::netlink(format!(
                "RX statistics truncated ({} of {RX_STATS_LEN} bytes)",
                data.len()
            )));
        }
        Ok(Self {
            total: data.get_u32_le(),
            fcs_errors: data.get_u32_le(),
            address_mismatch: data.get_u32_le(),
            good: data.get_u32_le(),
            avg_snr: data.get_u32_le(),
            avg_rssi: data.get_u32_le(),
            base_packet_id: data.get_u32_le(),
        })
    }

    /// Packet error rate in percent, `None` before any frame was seen
    pub fn per_percent(&self) -> Option<f64> {
        (self.total > 0).then(|| {
            let bad = self.total.saturating_sub(self.good);
            f64::from(bad) * 100.0 / f64::from(self.total)
        })
    }
}

impl std::fmt::Display for RxStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total received packets : {}", self.total)?;
        writeln!(f, "FCS errors             : {}", self.fcs_errors)?;
        writeln!(f, "Address mismatch       : {}", self.address_mismatch)?;
        writeln!(f, "Good packets           : {}", self.good)?;
        writeln!(f, "Average SNR            : {}", self.avg_snr)?;
        writeln!(f, "Average RSSI           : {}", self.avg_rssi)?;
        writeln!(f, "Base packet id         : {}", self.base_packet_id)?;
        match self.per_percent() {
            Some(per) => writeln!(f, "PER                    : {per:.2}%"),
            None => writeln!(f, "PER                    : n/a"),
        }
    }
}

/// `plt get_rx_statcs`
pub(crate) fn get_rx_statcs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    let answer = ctx.fw_query(test::RX_STAT_GET, &[])?;
    let stats = RxStats::parse(&answer.params)?;
    write!(ctx.out, "{stats}")?;
    Ok(())
}

/// `plt get_mac`
pub(crate) fn get_mac(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    let reply = ctx
        .testmode(&testmode::get_mac())?
        .ok_or_else(|| CalError::no_answer("GET_MAC"))?;
    let data = testmode::answer_data(&reply)?;
    let octets: [u8; 6] = data
        .get(..6)
        .and_then(|d| d.try_into().ok())
        .ok_or_else(|| CalError::netlink(format!("GET_MAC answer is {} bytes", data.len())))?;

    writeln!(ctx.out, "MAC address: {}", MacAddr(octets))?;
    Ok(())
}

/// `plt fw_version`
pub(crate) fn fw_version(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    let answer = ctx.fw_query(test::GET_FW_VERSIONS, &[])?;
    let params = &answer.params;
    if params.len() < FW_VERSION_STR_LEN + 4 {
        return Err(CalError::netlink(format!(
            "firmware version answer truncated ({} bytes)",
            params.len()
        )));
    }

    let raw = &params[..FW_VERSION_STR_LEN];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let fw = String::from_utf8_lossy(&raw[..end]);
    let [a, b, c, d] = (&params[FW_VERSION_STR_LEN..]).get_u32_le().to_be_bytes();

    writeln!(ctx.out, "Firmware version: {fw}")?;
    writeln!(ctx.out, "PHY version: {a}.{b}.{c}.{d}")?;
    Ok(())
}
