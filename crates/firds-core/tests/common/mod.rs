#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use firds_core::config::{AppConfig, CsvSection, DownloadSection, HttpSection, SourceSection};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_NAME: &str = "DLTINS_20210117_01of01.zip";
pub const INNER_XML_NAME: &str = "DLTINS_20210117_01of01.xml";

pub const RECORDS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BizData xmlns="urn:iso:std:iso:20022:tech:xsd:head.003.001.01">
  <Pyld>
    <Document xmlns="urn:iso:std:iso:20022:tech:xsd:auth.036.001.02">
      <FinInstrmRptgRefDataDltaRpt>
        <FinInstrm>
          <TermntdRcrd>
            <FinInstrmGnlAttrbts>
              <Id>DE000A1R07V3</Id>
              <FullNm>Kreditanst.f.Wiederaufbau Anl.v.2014 (2021)</FullNm>
              <ClssfctnTp>DBFTFB</ClssfctnTp>
              <NtnlCcy>EUR</NtnlCcy>
              <CmmdtyDerivInd>false</CmmdtyDerivInd>
            </FinInstrmGnlAttrbts>
            <Issr>549300GDPG70E3MBBU98</Issr>
          </TermntdRcrd>
        </FinInstrm>
        <FinInstrm>
          <NewRcrd>
            <FinInstrmGnlAttrbts>
              <Id>US0231351067</Id>
              <FullNm>Amazon.com Inc</FullNm>
              <ClssfctnTp>ESVUFR</ClssfctnTp>
              <NtnlCcy>USD</NtnlCcy>
              <CmmdtyDerivInd>false</CmmdtyDerivInd>
            </FinInstrmGnlAttrbts>
            <Issr>ZXTILKJKG63JELOEG630</Issr>
          </NewRcrd>
        </FinInstrm>
      </FinInstrmRptgRefDataDltaRpt>
    </Document>
  </Pyld>
</BizData>
"#;

pub fn index_xml(base_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <result name="response" numFound="2" start="0">
    <doc>
      <str name="download_link">{base_url}/firds/FULINS_C_20210117_01of01.zip</str>
      <str name="file_type">FULINS</str>
      <str name="file_name">FULINS_C_20210117_01of01.zip</str>
    </doc>
    <doc>
      <str name="checksum">cd7c3e1e5b2d4e6ab64b83e4a6d1c1b6</str>
      <str name="download_link">{base_url}/firds/{ARCHIVE_NAME}</str>
      <date name="publication_date">2021-01-17T00:00:00Z</date>
      <str name="file_type">DLTINS</str>
      <str name="file_name">{ARCHIVE_NAME}</str>
    </doc>
  </result>
</response>
"#
    )
}

pub fn archive_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in entries {
            zip.start_file(*name, options).expect("start zip entry");
            zip.write_all(contents.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip");
    }
    buffer
}

/// Serves `router` on an ephemeral local port for the rest of the test.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

pub fn test_config(source_url: String, download: &Path, csv: &Path) -> AppConfig {
    AppConfig {
        sourcefile: SourceSection {
            xml_source_url: source_url,
            file_type: "DLTINS".to_string(),
            index_file_name: "sourcefile.xml".to_string(),
        },
        download: DownloadSection {
            download_path: download.to_path_buf(),
        },
        csv: CsvSection {
            csv_path: csv.to_path_buf(),
        },
        aws: None,
        http: HttpSection {
            connect_timeout_secs: 5,
            timeout_secs: 30,
        },
    }
}
