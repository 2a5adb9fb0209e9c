//! SDX55 debug clock topology.
//!
//! Three debug muxes share the counter block of the global clock controller:
//!
//! ```text
//! gcc_debug_mux (root, qcom,gcc)
//! ├── apss_cc_debug_mux (qcom,apsscc) ── measure_only_apcs_clk
//! ├── mc_cc_debug_mux   (qcom,mccc, no selector) ── measure_only_bimc_clk
//! └── 48 GCC branch clocks and measure-only placeholders
//! ```

use crate::config::{MeasureConfig, MuxConfig, PlaceholderConfig, TopologyConfig};

/// Name of the reference oscillator the counter is paced by.
pub const REFERENCE: &str = "xo_clk_src";

/// Nominal rate of the reference oscillator.
pub const XO_RATE: u64 = 19_200_000;

/// Root mux.
pub const ROOT: &str = "gcc_debug_mux";

/// Register window sizes of the part.
pub const WINDOWS: &[(&str, u64)] = &[
    ("qcom,gcc", 0x1F_0000),
    ("qcom,apsscc", 0x1000),
    ("qcom,mccc", 0x1000),
];

/// Nominal rate of every measure-only placeholder.
const PLACEHOLDER_RATE: u64 = 1000;

/// Sources of the root mux and their selector codes.
const GCC_SOURCES: &[(&str, u32)] = &[
    ("apss_cc_debug_mux", 0x7C),
    ("gcc_blsp1_ahb_clk", 0x34),
    ("gcc_blsp1_qup1_i2c_apps_clk", 0x37),
    ("gcc_blsp1_qup1_spi_apps_clk", 0x36),
    ("gcc_blsp1_qup2_i2c_apps_clk", 0x3B),
    ("gcc_blsp1_qup2_spi_apps_clk", 0x3A),
    ("gcc_blsp1_qup3_i2c_apps_clk", 0x3F),
    ("gcc_blsp1_qup3_spi_apps_clk", 0x3E),
    ("gcc_blsp1_qup4_i2c_apps_clk", 0x43),
    ("gcc_blsp1_qup4_spi_apps_clk", 0x42),
    ("gcc_blsp1_uart1_apps_clk", 0x38),
    ("gcc_blsp1_uart2_apps_clk", 0x3C),
    ("gcc_blsp1_uart3_apps_clk", 0x40),
    ("gcc_blsp1_uart4_apps_clk", 0x44),
    ("gcc_boot_rom_ahb_clk", 0x4B),
    ("gcc_ce1_ahb_clk", 0x60),
    ("gcc_ce1_axi_clk", 0x5F),
    ("gcc_ce1_clk", 0x5E),
    ("gcc_cpuss_rbcpr_clk", 0x76),
    ("gcc_eth_axi_clk", 0xCB),
    ("gcc_eth_ptp_clk", 0xFD),
    ("gcc_eth_rgmii_clk", 0xC9),
    ("gcc_eth_slave_ahb_clk", 0xCA),
    ("gcc_gp1_clk", 0x85),
    ("gcc_gp2_clk", 0x86),
    ("gcc_gp3_clk", 0x87),
    ("gcc_pcie_aux_clk", 0x99),
    ("gcc_pcie_cfg_ahb_clk", 0x98),
    ("gcc_pcie_mstr_axi_clk", 0x97),
    ("gcc_pcie_pipe_clk", 0x9A),
    ("gcc_pcie_rchng_phy_clk", 0xB9),
    ("gcc_pcie_sleep_clk", 0x9C),
    ("gcc_pcie_slv_axi_clk", 0x96),
    ("gcc_pcie_slv_q2a_axi_clk", 0x95),
    ("gcc_pdm2_clk", 0x48),
    ("gcc_pdm_ahb_clk", 0x46),
    ("gcc_pdm_xo4_clk", 0x47),
    ("gcc_sdcc1_ahb_clk", 0x33),
    ("gcc_sdcc1_apps_clk", 0x32),
    ("gcc_usb30_master_clk", 0x28),
    ("gcc_usb30_mock_utmi_clk", 0x2A),
    ("gcc_usb30_mstr_axi_clk", 0x4F),
    ("gcc_usb30_sleep_clk", 0x29),
    ("gcc_usb30_slv_ahb_clk", 0x6B),
    ("gcc_usb3_phy_aux_clk", 0x2B),
    ("gcc_usb3_phy_pipe_clk", 0x2D),
    ("gcc_usb_phy_cfg_ahb2phy_clk", 0x31),
    ("mc_cc_debug_mux", 0x73),
    ("measure_only_ipa_2x_clk", 0xAC),
    ("measure_only_snoc_clk", 0x109),
    ("measure_only_qpic_clk", 0xB1),
];

/// Measure-only placeholders registered alongside the muxes.
const PLACEHOLDERS: &[&str] = &[
    "measure_only_bimc_clk",
    "measure_only_ipa_2x_clk",
    "measure_only_snoc_clk",
    "measure_only_qpic_clk",
    "measure_only_mccc_clk",
    "measure_only_apcs_clk",
];

/// Counter block of the global clock controller.
pub fn measure() -> MeasureConfig {
    MeasureConfig::new(ROOT, 0x79004, 0x79008, 0x22010)
}

/// Applications-processor subsystem debug mux.
pub fn apss_cc_debug_mux() -> MuxConfig {
    MuxConfig {
        name: "apss_cc_debug_mux".into(),
        window: "qcom,apsscc".into(),
        debug_offset: 0x1C,
        post_div_offset: 0,
        cbcr_offset: None,
        src_sel_mask: 0x38,
        src_sel_shift: 3,
        post_div_mask: 0,
        post_div_shift: 0,
        post_div_val: 1,
        parents: vec!["measure_only_apcs_clk".into()],
        sels: vec![0x3],
        pre_divs: Some(vec![1]),
    }
}

/// Global clock controller debug mux; feeds the counter.
pub fn gcc_debug_mux() -> MuxConfig {
    MuxConfig {
        name: ROOT.into(),
        window: "qcom,gcc".into(),
        debug_offset: 0x79000,
        post_div_offset: 0x29000,
        cbcr_offset: Some(0x29004),
        src_sel_mask: 0x3FF,
        src_sel_shift: 0,
        post_div_mask: 0xF,
        post_div_shift: 0,
        post_div_val: 4,
        parents: GCC_SOURCES.iter().map(|(name, _)| (*name).to_string()).collect(),
        sels: GCC_SOURCES.iter().map(|&(_, sel)| sel).collect(),
        pre_divs: None,
    }
}

/// Memory controller debug counter; no selector.
pub fn mc_cc_debug_mux() -> MuxConfig {
    // The MCCC period register at 0x50 is not modelled; the BIMC clock is counted by
    // the shared GCC counter like every other source.
    MuxConfig::pass_through("mc_cc_debug_mux", "qcom,mccc", "measure_only_bimc_clk")
}

/// The complete SDX55 topology.
pub fn topology() -> TopologyConfig {
    TopologyConfig {
        name: "sdx55".into(),
        measure: measure(),
        muxes: vec![apss_cc_debug_mux(), gcc_debug_mux(), mc_cc_debug_mux()],
        placeholders: PLACEHOLDERS
            .iter()
            .map(|name| PlaceholderConfig::new(*name, PLACEHOLDER_RATE))
            .collect(),
    }
}
